//! Cache store - the single JSON snapshot behind all cached sections
//!
//! The snapshot is loaded from disk at most once per store; after that the
//! in-memory copy is authoritative until the process exits. `save` rewrites
//! the whole document. An unreadable snapshot is moved into the fallback
//! directory and the store starts empty instead of failing.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::paths::{cache_file, fallback_dir, CACHE_FILE_NAME};

/// A cached payload: caller-defined fields plus the reserved `mtime` stamp.
pub type Entry = serde_json::Map<String, serde_json::Value>;

/// One named partition of the cache, keyed by entry title.
pub type Section = BTreeMap<String, Entry>;

/// The full snapshot shape: section name -> title -> entry.
type Sections = BTreeMap<String, Section>;

/// File-backed cache store with lazy, corruption-tolerant loading.
pub struct CacheStore {
    file: PathBuf,
    fallback_dir: PathBuf,
    state: Mutex<Option<Sections>>,
}

impl CacheStore {
    /// Create a store over an explicit snapshot file and fallback directory.
    pub fn new(file: PathBuf, fallback_dir: PathBuf) -> Self {
        Self {
            file,
            fallback_dir,
            state: Mutex::new(None),
        }
    }

    /// Create a store rooted at a project directory (see `core::paths`).
    pub fn open(root: &Path) -> Self {
        Self::new(cache_file(root), fallback_dir(root))
    }

    /// Path of the persisted snapshot.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Run `f` against the named section, creating the section if absent.
    ///
    /// The first access on any store loads the snapshot from disk exactly
    /// once. Mutations made by `f` are visible to later calls and to `save`;
    /// the section itself stays queryable for the rest of the process.
    pub fn with_section<R>(&self, name: &str, f: impl FnOnce(&mut Section) -> R) -> R {
        let mut state = self.lock();
        let sections = state.get_or_insert_with(|| self.load_or_recover());
        f(sections.entry(name.to_string()).or_default())
    }

    /// Serialize the full structure as indented JSON and overwrite the
    /// snapshot file.
    ///
    /// Write failures (disk full, permissions) propagate; nothing is retried.
    pub fn save(&self) -> Result<()> {
        let mut state = self.lock();
        let sections = state.get_or_insert_with(|| self.load_or_recover());

        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create cache directory {}", dir.display()))?;
        }

        // 4-space indentation, matching the on-disk format readers expect.
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        sections
            .serialize(&mut serializer)
            .context("failed to serialize cache contents")?;
        buf.push(b'\n');

        fs::write(&self.file, buf)
            .with_context(|| format!("failed to write cache file {}", self.file.display()))?;
        Ok(())
    }

    /// Clone of the full structure for read-only inspection.
    pub fn snapshot(&self) -> BTreeMap<String, Section> {
        let mut state = self.lock();
        state.get_or_insert_with(|| self.load_or_recover()).clone()
    }

    /// Drop one section. Administrative only; the regeneration path never
    /// evicts anything.
    pub fn remove_section(&self, name: &str) -> bool {
        let mut state = self.lock();
        state
            .get_or_insert_with(|| self.load_or_recover())
            .remove(name)
            .is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Sections>> {
        // A caller panicking inside `with_section` leaves the data intact;
        // keep serving it rather than poisoning every later access.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the snapshot, moving an unreadable file aside and starting empty.
    fn load_or_recover(&self) -> Sections {
        if !self.file.is_file() {
            return Sections::new();
        }

        let parsed = fs::read_to_string(&self.file)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from));

        match parsed {
            Ok(sections) => sections,
            Err(err) => {
                let moved = self.move_aside();
                eprintln!(
                    "[recache] cache file {} is unreadable ({}); {} and starting with an empty cache",
                    self.file.display(),
                    err,
                    moved
                );
                Sections::new()
            }
        }
    }

    /// Best-effort rename of the bad snapshot into the fallback directory,
    /// keeping the same filename.
    fn move_aside(&self) -> String {
        let name = self
            .file
            .file_name()
            .unwrap_or_else(|| CACHE_FILE_NAME.as_ref());
        let target = self.fallback_dir.join(name);

        let renamed = fs::create_dir_all(&self.fallback_dir)
            .and_then(|_| fs::rename(&self.file, &target));
        match renamed {
            Ok(()) => format!("moved it to {}", target.display()),
            Err(err) => format!("could not move it aside ({})", err),
        }
    }
}

static SHARED: OnceCell<CacheStore> = OnceCell::new();

/// Process-wide store, initialized on first use.
///
/// Later calls ignore `root`; the first caller decides where the cache lives.
/// Code that needs isolation (tests) constructs its own `CacheStore` instead.
pub fn shared(root: &Path) -> &'static CacheStore {
    SHARED.get_or_init(|| CacheStore::open(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn store_at(dir: &Path) -> CacheStore {
        CacheStore::new(dir.join("cache.json"), dir.join("tmp"))
    }

    fn entry(value: serde_json::Value) -> Entry {
        value.as_object().cloned().expect("entry must be an object")
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        assert!(store.snapshot().is_empty());
        // Reading alone must not create the snapshot file.
        assert!(!temp.path().join("cache.json").exists());
    }

    #[test]
    fn test_with_section_shares_mutations() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        store.with_section("builds", |section| {
            section.insert("app.bin".to_string(), entry(json!({"result": "ok"})));
        });

        let seen = store.with_section("builds", |section| section.get("app.bin").cloned());
        assert_eq!(seen, Some(entry(json!({"result": "ok"}))));
    }

    #[test]
    fn test_with_section_creates_empty_section() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        let len = store.with_section("fresh", |section| section.len());
        assert_eq!(len, 0);
        assert!(store.snapshot().contains_key("fresh"));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        store.with_section("builds", |section| {
            section.insert(
                "app.bin".to_string(),
                entry(json!({"result": "ok", "mtime": 100.5})),
            );
        });
        store.save().unwrap();

        let reloaded = store_at(temp.path());
        let snapshot = reloaded.snapshot();
        assert_eq!(
            snapshot["builds"]["app.bin"],
            entry(json!({"result": "ok", "mtime": 100.5}))
        );
    }

    #[test]
    fn test_save_writes_indented_json() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        store.with_section("builds", |section| {
            section.insert("app.bin".to_string(), entry(json!({"mtime": 1})));
        });
        store.save().unwrap();

        let text = fs::read_to_string(temp.path().join("cache.json")).unwrap();
        assert!(text.contains("    \"builds\""));
        assert!(text.contains("        \"app.bin\""));
    }

    #[test]
    fn test_corrupt_file_moved_aside() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("cache.json"), "{ not json").unwrap();

        let store = store_at(temp.path());
        assert!(store.snapshot().is_empty());

        // Original snapshot relocated, same filename, content preserved.
        let moved = temp.path().join("tmp").join("cache.json");
        assert_eq!(fs::read_to_string(&moved).unwrap(), "{ not json");
        assert!(!temp.path().join("cache.json").exists());
    }

    #[test]
    fn test_unexpected_shape_is_treated_as_corrupt() {
        let temp = tempdir().unwrap();
        // Valid JSON, wrong shape: entries must be objects.
        fs::write(temp.path().join("cache.json"), r#"{"builds": {"app": 3}}"#).unwrap();

        let store = store_at(temp.path());
        assert!(store.snapshot().is_empty());
        assert!(temp.path().join("tmp").join("cache.json").exists());
    }

    #[test]
    fn test_corrupt_file_loaded_once_then_memory_wins() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("cache.json"), "garbage").unwrap();

        let store = store_at(temp.path());
        store.with_section("s", |section| {
            section.insert("t".to_string(), entry(json!({"mtime": 0})));
        });

        // A second corrupt file appearing on disk is ignored: the in-memory
        // copy stays authoritative after the first load.
        fs::write(temp.path().join("cache.json"), "more garbage").unwrap();
        assert!(store.snapshot()["s"].contains_key("t"));
    }

    #[test]
    fn test_remove_section() {
        let temp = tempdir().unwrap();
        let store = store_at(temp.path());

        store.with_section("a", |_| {});
        store.with_section("b", |_| {});

        assert!(store.remove_section("a"));
        assert!(!store.remove_section("a"));

        let snapshot = store.snapshot();
        assert!(!snapshot.contains_key("a"));
        assert!(snapshot.contains_key("b"));
    }
}
