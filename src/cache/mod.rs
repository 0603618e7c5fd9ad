//! Cache module - Manages the .recache/ snapshot
//!
//! Provides:
//! - The file-backed store (one JSON document, lazily loaded, section-partitioned)
//! - The mtime-gated entry cache built on top of it
//! - Corruption recovery (unreadable snapshots are moved aside, never fatal)

pub mod filecache;
pub mod store;
