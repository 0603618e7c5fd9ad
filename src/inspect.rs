//! Cache inspection and administration commands
//!
//! `list` and `status` are read-only views over the snapshot; `clear` is the
//! one administrative escape hatch for a cache that otherwise never evicts.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::cache::filecache::entry_mtime;
use crate::cache::store::{CacheStore, Entry};
use crate::core::render::{EntryView, Freshness, OutputFormat, RenderConfig, Renderer};
use crate::core::util::file_mtime;

/// Run the list command
pub fn run_list(
    store: &CacheStore,
    root: &Path,
    section: Option<&str>,
    filter: Option<&str>,
    config: RenderConfig,
) -> Result<()> {
    let filter = filter
        .map(Regex::new)
        .transpose()
        .context("invalid --filter pattern")?;

    let mut views = Vec::new();
    for (name, entries) in store.snapshot() {
        if section.is_some_and(|s| s != name.as_str()) {
            continue;
        }
        for (title, entry) in entries {
            if filter.as_ref().is_some_and(|re| !re.is_match(&title)) {
                continue;
            }
            let freshness = freshness_for(root, &title, &entry);
            views.push(EntryView::from_entry(&name, &title, &entry).with_freshness(freshness));
        }
    }

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render(&views));
    Ok(())
}

/// Freshness of one entry, judged against the source file when it still
/// exists. Titles are root-relative by convention; a title that no longer
/// resolves to a file reports `missing`.
fn freshness_for(root: &Path, title: &str, entry: &Entry) -> Freshness {
    match file_mtime(&root.join(title)) {
        Ok(ondisk) if ondisk > entry_mtime(entry) => Freshness::Stale,
        Ok(_) => Freshness::Fresh,
        Err(_) => Freshness::Missing,
    }
}

/// Snapshot-level health summary
#[derive(Debug, Serialize)]
struct StatusReport {
    cache_file: String,
    exists: bool,
    size_bytes: u64,
    sections: BTreeMap<String, usize>,
}

/// Run the status command
pub fn run_status(store: &CacheStore, config: RenderConfig) -> Result<()> {
    let snapshot = store.snapshot();
    let file = store.file();

    let report = StatusReport {
        cache_file: file.display().to_string(),
        exists: file.is_file(),
        size_bytes: fs::metadata(file).map(|m| m.len()).unwrap_or(0),
        sections: snapshot
            .iter()
            .map(|(name, entries)| (name.clone(), entries.len()))
            .collect(),
    };

    match config.format {
        OutputFormat::Markdown | OutputFormat::Raw => {
            println!("cache file: {}", report.cache_file);
            println!("exists: {}", report.exists);
            println!("size: {} bytes", report.size_bytes);
            for (name, count) in &report.sections {
                println!("  {}: {} entries", name, count);
            }
        }
        _ => {
            let json = if config.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
    }
    Ok(())
}

/// Run the clear command
pub fn run_clear(store: &CacheStore, section: Option<&str>) -> Result<()> {
    match section {
        Some(name) => {
            if store.remove_section(name) {
                store.save()?;
                eprintln!("cleared section '{}'", name);
            } else {
                eprintln!("no such section '{}'", name);
            }
        }
        None => {
            let file = store.file();
            if file.is_file() {
                fs::remove_file(file)
                    .with_context(|| format!("failed to remove {}", file.display()))?;
            }
            eprintln!("cleared cache snapshot");
        }
    }
    Ok(())
}
