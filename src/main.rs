//! recache - mtime-gated caching of derived file data
//!
//! recache provides:
//! - A file-backed JSON cache partitioned into named sections
//! - Staleness checks driven by source-file modification times
//! - A built-in content-digest generator (xxh3/sha1) running through the cache
//! - Unified output format (jsonl/json/md/raw)

use anyhow::Result;
use clap::Parser;

mod cache;
mod cli;
mod core;
mod digest;
mod inspect;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}
