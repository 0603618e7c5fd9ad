//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::render::{OutputFormat, RenderConfig};
use crate::core::util::HashAlgorithm;

/// recache - a file-backed cache for derived file data, keyed by mtime.
#[derive(Parser, Debug)]
#[command(name = "recache")]
#[command(
    author,
    version,
    about,
    long_about = r#"recache keeps derived per-file data (content digests) in a single JSON
snapshot and only recomputes an entry when its source file's modification
time moves past the time recorded at generation.

The snapshot lives at <ROOT>/.recache/cache.json, partitioned into sections
(one per digest algorithm). An unreadable snapshot is moved aside to
<ROOT>/.recache/tmp/ and the cache restarts empty instead of failing.

Output formats:
- jsonl: one JSON object per line (best for piping into tools)
- json: a single JSON array
- md: human-friendly Markdown
- raw: digest-only lines, sha1sum-style (digest command)

Examples:
    recache digest src
    recache digest model.bin --algo sha1
    recache list --filter '\.rs$'
    recache status
    recache clear --section xxh3
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        env = "RECACHE_ROOT",
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
The cache snapshot lives under <ROOT>/.recache/ and entry titles are\n\
recorded relative to this root."
    )]
    pub root: PathBuf,

    /// Output format (jsonl/json/md/raw).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select the output format.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\
- raw (digest-only lines)\n\n\
Tip: Prefer jsonl when you want stable, line-oriented output for piping."
    )]
    pub format: String,

    /// Disable colored output (when applicable).
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on md/raw formats."
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute or reuse content digests for files through the cache.
    #[command(
        long_about = "Digest the given files, reusing cached results for files whose\n\
modification time has not advanced since the cached digest was computed.\n\n\
Directory arguments fan out over their contained files (gitignore-aware,\n\
hidden files skipped unless --hidden). Explicitly named files must exist.\n\n\
Examples:\n\
  recache digest src\n\
  recache digest build/app.bin --algo sha1\n\
  recache digest . --hidden --no-ignore\n"
    )]
    Digest {
        /// Files or directories to digest.
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Digest algorithm (xxh3/sha1).
        #[arg(long, default_value = "xxh3", value_name = "ALGO")]
        algo: String,

        /// Include hidden files when walking directories.
        #[arg(long)]
        hidden: bool,

        /// Do not respect .gitignore files when walking directories.
        #[arg(long)]
        no_ignore: bool,
    },

    /// List cached entries with their freshness against the source files.
    #[command(
        long_about = "List cached entries. Each entry reports whether its source file is\n\
unchanged (fresh), has been modified since caching (stale), or no longer\n\
exists (missing).\n\n\
Examples:\n\
  recache list\n\
  recache list --section sha1\n\
  recache list --filter '\\.bin$'\n"
    )]
    List {
        /// Restrict to one section.
        #[arg(long, value_name = "NAME")]
        section: Option<String>,

        /// Only titles matching this regular expression.
        #[arg(long, value_name = "REGEX")]
        filter: Option<String>,
    },

    /// Show cache location, size and per-section entry counts.
    Status,

    /// Drop a section from the cache, or delete the whole snapshot.
    #[command(
        long_about = "Administrative cleanup. The cache itself never evicts entries; this\n\
command is the manual remedy for unbounded growth.\n\n\
With --section, one section is dropped and the snapshot is rewritten.\n\
Without, the snapshot file is deleted entirely.\n"
    )]
    Clear {
        /// Drop only this section and keep the rest.
        #[arg(long, value_name = "NAME")]
        section: Option<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    // Parse output format
    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let config = RenderConfig::with_pretty(format, cli.pretty);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let store = crate::cache::store::shared(&root);

    match cli.command {
        Commands::Digest {
            paths,
            algo,
            hidden,
            no_ignore,
        } => {
            let algorithm: HashAlgorithm = algo.parse()?;
            crate::digest::run_digest(store, &root, &paths, algorithm, hidden, !no_ignore, config)
        }

        Commands::List { section, filter } => {
            crate::inspect::run_list(store, &root, section.as_deref(), filter.as_deref(), config)
        }

        Commands::Status => crate::inspect::run_status(store, config),

        Commands::Clear { section } => crate::inspect::run_clear(store, section.as_deref()),
    }
}
