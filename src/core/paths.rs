//! Path resolution and normalization utilities
//!
//! Resolves where the cache snapshot and its corruption fallback live, and
//! normalizes entry titles to '/'-separated paths relative to root.

use std::path::{Path, PathBuf};

/// Snapshot file name, kept identical when relocated on corruption
pub const CACHE_FILE_NAME: &str = "cache.json";

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Get the .recache cache directory for a given root
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(".recache")
}

/// The persisted cache snapshot for a given root
pub fn cache_file(root: &Path) -> PathBuf {
    cache_dir(root).join(CACHE_FILE_NAME)
}

/// Scratch directory an unreadable snapshot is moved into
pub fn fallback_dir(root: &Path) -> PathBuf {
    cache_dir(root).join("tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_cache_dir() {
        let root = Path::new("/project");
        assert_eq!(cache_dir(root), PathBuf::from("/project/.recache"));
    }

    #[test]
    fn test_cache_file_and_fallback_share_base_name() {
        let root = Path::new("/project");
        assert_eq!(
            cache_file(root),
            PathBuf::from("/project/.recache/cache.json")
        );
        assert_eq!(fallback_dir(root), PathBuf::from("/project/.recache/tmp"));
        assert_eq!(
            fallback_dir(root).join(CACHE_FILE_NAME),
            PathBuf::from("/project/.recache/tmp/cache.json")
        );
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/main.rs");
        assert_eq!(make_relative(path, root), Some("src/main.rs".to_string()));
    }

    #[test]
    fn test_make_relative_not_under_root() {
        let root = Path::new("/project");
        let path = Path::new("/other/file.rs");
        assert_eq!(make_relative(path, root), None);
    }
}
