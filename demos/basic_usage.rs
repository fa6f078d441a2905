//! Basic usage of patricia-store.

use patricia_store::{Config, MemStore, Tree};

fn main() -> patricia_store::Result<()> {
    example_memory()?;
    example_on_disk()?;
    Ok(())
}

fn example_memory() -> patricia_store::Result<()> {
    println!("=== Tree<MemStore> ===\n");

    let mut tree = Tree::with_store(MemStore::new())?;

    tree.insert("http://example.com/page1", "1")?;
    tree.insert("http://example.com/page2", "2")?;
    tree.insert("http://other.com/page1", "3")?;
    tree.insert("http://example.com/page1", "1b")?;

    println!("example.com/page1 = {:?}", tree.get("http://example.com/page1")?);
    println!("example.com/page3 = {:?}", tree.get("http://example.com/page3")?);

    let root = tree.root()?;
    let (closest, matched) = tree.lookup(&root, b"http://example.com/page9", 0)?;
    println!(
        "closest to page9: {:?} ({} bytes matched)\n",
        String::from_utf8_lossy(&closest.path),
        matched
    );

    println!("Prefix scan for 'http://example.com/':");
    for (key, values) in tree.scan_prefix("http://example.com/")? {
        println!("  {} = {:?}", String::from_utf8_lossy(&key), values);
    }

    println!("\nLayout:");
    tree.dump(&mut std::io::stdout())?;
    println!("\nLast issued id: {}\n", tree.close()?);
    Ok(())
}

fn example_on_disk() -> patricia_store::Result<()> {
    println!("=== Tree<RedbStore> ===\n");

    let path = std::env::temp_dir().join("patricia-store-demo.redb");
    let config = Config {
        cache_size: 4 * 1024 * 1024,
        ..Config::default()
    };

    let mut tree = Tree::open_with_config(&path, &config)?;
    for word in ["apple", "app", "apply", "banana", "band"] {
        tree.insert(word, word.to_uppercase())?;
    }
    let watermark = tree.close()?;
    println!("Closed at watermark {}", watermark);

    let tree = Tree::open_with_config(&path, &config)?;
    println!("Reopened, entries:");
    for (key, values) in tree.entries()? {
        println!("  {} = {:?}", String::from_utf8_lossy(&key), values);
    }
    tree.close()?;

    std::fs::remove_file(&path)?;
    Ok(())
}
