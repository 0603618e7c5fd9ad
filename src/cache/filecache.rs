//! File-backed entry cache - mtime-gated reuse of derived per-file data
//!
//! An entry stays valid while its source file's modification time is not
//! newer than the stamp recorded when the entry was generated. A stale or
//! missing entry is regenerated by the caller-supplied generator and the
//! whole snapshot is persisted.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cache::store::{CacheStore, Entry};
use crate::core::util::file_mtime;

/// Reserved entry field holding the source mtime at generation time.
/// Always overwritten by the cache; generators must not rely on it.
pub const MTIME_KEY: &str = "mtime";

/// Stored stamp of an entry, `0.0` when absent (always stale against any
/// real file).
pub fn entry_mtime(entry: &Entry) -> f64 {
    entry.get(MTIME_KEY).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

/// Return the cached entry for `(section, title)` if it is still fresh for
/// `path`, otherwise regenerate it with `generate` and persist the result.
///
/// Returns `Ok(None)` when the generator declines to produce data; nothing
/// is written or saved in that case. Statting `path` and writing the
/// snapshot are the two fallible steps and both propagate.
pub fn cached_for_file<F>(
    store: &CacheStore,
    section: &str,
    title: &str,
    path: &Path,
    generate: F,
) -> Result<Option<Entry>>
where
    F: FnOnce() -> Option<Entry>,
{
    let existing = store.with_section(section, |section| section.get(title).cloned());

    // The mtime observed here, before the generator runs, is the one that
    // was validated; it becomes the stamp even if the file changes
    // mid-generation.
    let ondisk_mtime =
        file_mtime(path).with_context(|| format!("failed to stat {}", path.display()))?;

    if let Some(entry) = existing.filter(|entry| ondisk_mtime <= entry_mtime(entry)) {
        return Ok(Some(entry));
    }

    let Some(mut entry) = generate() else {
        return Ok(None);
    };

    entry.insert(MTIME_KEY.to_string(), ondisk_mtime.into());
    store.with_section(section, |section| {
        section.insert(title.to_string(), entry.clone());
    });
    store.save()?;

    Ok(Some(entry))
}
