//! Digest backend
//!
//! Computes content digests of source files through the file-backed cache,
//! so unchanged files are never re-hashed. Directories fan out through the
//! ignore-aware walker.

use anyhow::Result;
use ignore::WalkBuilder;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cache::filecache::cached_for_file;
use crate::cache::store::{CacheStore, Entry};
use crate::core::paths::{cache_dir, make_relative, normalize_path};
use crate::core::render::{EntryView, RenderConfig, Renderer};
use crate::core::util::{get_file_size, hash_file, HashAlgorithm};

/// Digest one file through the cache, keyed by its root-relative path.
///
/// Missing or unstattable files propagate as errors (caller error); a file
/// that exists but cannot be read makes the generator decline, which is
/// reported per item rather than failing the run.
pub fn digest_file(
    store: &CacheStore,
    root: &Path,
    path: &Path,
    algorithm: HashAlgorithm,
) -> Result<Option<Entry>> {
    let title = title_for(root, path);
    cached_for_file(store, algorithm.section(), &title, path, || {
        generate(path, algorithm)
    })
}

/// The generator: streaming digest plus size
fn generate(path: &Path, algorithm: HashAlgorithm) -> Option<Entry> {
    let digest = hash_file(path, algorithm).ok()?;
    let size = get_file_size(path).ok()?;
    json!({ "digest": digest, "size": size }).as_object().cloned()
}

fn title_for(root: &Path, path: &Path) -> String {
    make_relative(path, root).unwrap_or_else(|| normalize_path(path))
}

/// Expand targets into concrete files: directories fan out through the
/// walker, explicit files pass through (missing ones fail later, per item
/// stat, as caller errors).
fn collect_files(
    root: &Path,
    targets: &[PathBuf],
    hidden: bool,
    ignore: bool,
) -> Vec<PathBuf> {
    let own_cache = cache_dir(root);
    let mut files = Vec::new();

    for target in targets {
        let full = if target.is_absolute() {
            target.clone()
        } else {
            root.join(target)
        };

        if full.is_dir() {
            let mut builder = WalkBuilder::new(&full);
            builder
                .hidden(!hidden)
                .git_ignore(ignore)
                .git_global(ignore)
                .git_exclude(ignore);

            for entry in builder.build() {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                let path = entry.path();
                if path.is_dir() {
                    continue;
                }
                // Never digest our own snapshot.
                if path.starts_with(&own_cache) {
                    continue;
                }
                files.push(path.to_path_buf());
            }
        } else {
            files.push(full);
        }
    }

    files.sort();
    files.dedup();
    files
}

fn view_for(
    store: &CacheStore,
    root: &Path,
    path: &Path,
    algorithm: HashAlgorithm,
) -> Result<EntryView> {
    let title = title_for(root, path);
    match digest_file(store, root, path, algorithm)? {
        Some(entry) => Ok(EntryView::from_entry(algorithm.section(), &title, &entry)),
        None => Ok(EntryView::error(
            algorithm.section(),
            &title,
            "failed to read file".to_string(),
        )),
    }
}

#[cfg(not(feature = "parallel"))]
fn digest_all(
    store: &CacheStore,
    root: &Path,
    files: &[PathBuf],
    algorithm: HashAlgorithm,
) -> Result<Vec<EntryView>> {
    files
        .iter()
        .map(|path| view_for(store, root, path, algorithm))
        .collect()
}

#[cfg(feature = "parallel")]
fn digest_all(
    store: &CacheStore,
    root: &Path,
    files: &[PathBuf],
    algorithm: HashAlgorithm,
) -> Result<Vec<EntryView>> {
    use rayon::prelude::*;

    files
        .par_iter()
        .map(|path| view_for(store, root, path, algorithm))
        .collect()
}

/// Run the digest command
pub fn run_digest(
    store: &CacheStore,
    root: &Path,
    targets: &[PathBuf],
    algorithm: HashAlgorithm,
    hidden: bool,
    ignore: bool,
    config: RenderConfig,
) -> Result<()> {
    let files = collect_files(root, targets, hidden, ignore);
    let views = digest_all(store, root, &files, algorithm)?;

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render(&views));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn store_at(dir: &Path) -> CacheStore {
        CacheStore::new(
            dir.join(".recache/cache.json"),
            dir.join(".recache/tmp"),
        )
    }

    #[test]
    fn test_digest_file_caches_under_algorithm_section() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());
        fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let entry = digest_file(
            &store,
            temp.path(),
            &temp.path().join("a.txt"),
            HashAlgorithm::Xxh3,
        )
        .unwrap()
        .expect("readable file digests");

        assert!(entry.get("digest").and_then(|v| v.as_str()).is_some());
        assert_eq!(entry.get("size"), Some(&serde_json::json!(5)));
        assert!(entry.get("mtime").is_some());

        let cached = store.with_section("xxh3", |s| s.get("a.txt").cloned());
        assert_eq!(cached.as_ref(), Some(&entry));
    }

    #[test]
    fn test_digest_missing_file_is_caller_error() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        let result = digest_file(
            &store,
            temp.path(),
            &temp.path().join("gone.txt"),
            HashAlgorithm::Sha1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_collect_files_walks_directories_sorted() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("data/sub")).unwrap();
        fs::write(temp.path().join("data/b.txt"), "b").unwrap();
        fs::write(temp.path().join("data/a.txt"), "a").unwrap();
        fs::write(temp.path().join("data/sub/c.txt"), "c").unwrap();

        let files = collect_files(temp.path(), &[PathBuf::from("data")], false, true);
        let names: Vec<_> = files
            .iter()
            .map(|p| make_relative(p, temp.path()).unwrap())
            .collect();
        assert_eq!(names, vec!["data/a.txt", "data/b.txt", "data/sub/c.txt"]);
    }

    #[test]
    fn test_collect_files_skips_own_snapshot() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join(".recache")).unwrap();
        fs::write(temp.path().join(".recache/cache.json"), "{}").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();

        let files = collect_files(temp.path(), &[PathBuf::from(".")], true, true);
        assert!(files
            .iter()
            .all(|p| !p.to_string_lossy().contains("cache.json")));
    }
}
