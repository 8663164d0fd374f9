//! `depresolve cache info` / `depresolve cache clear`, operating on the
//! durable JSON cache directory the registry and vulnerability adapters
//! write to. Mirrors the teacher's `commands/cache.rs` store-stats/clean
//! pair, minus the content-addressable-store specifics that don't apply
//! here.

use anyhow::Result;
use depresolve::cache::DurableStore;
use depresolve::durable::FileDurableStore;
use depresolve::Config;
use std::fs;
use std::path::Path;

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                total += dir_size(&entry_path);
            } else if let Ok(meta) = fs::metadata(&entry_path) {
                total += meta.len();
            }
        }
    }
    total
}

pub fn run_info() -> Result<()> {
    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;

    let registry_store = FileDurableStore::new(cache_dir.join("registry"));
    let vuln_store = FileDurableStore::new(cache_dir.join("vulnerabilities"));

    let registry_entries = registry_store.iter_all().map(|v| v.len()).unwrap_or(0);
    let vuln_entries = vuln_store.iter_all().map(|v| v.len()).unwrap_or(0);

    println!("Cache directory: {}", cache_dir.display());
    println!("  registry entries:       {}", registry_entries);
    println!("  vulnerability entries:  {}", vuln_entries);
    println!("  on-disk size:           {}", format_size(dir_size(&cache_dir)));
    Ok(())
}

pub fn run_clear() -> Result<()> {
    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    if cache_dir.exists() {
        fs::remove_dir_all(&cache_dir)?;
        println!("Removed {}", cache_dir.display());
    } else {
        println!("Cache directory {} does not exist, nothing to do.", cache_dir.display());
    }
    Ok(())
}
