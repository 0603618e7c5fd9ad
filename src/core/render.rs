//! Renderer module
//!
//! Renders cached entries to different output formats: jsonl, json, md, raw

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cache::filecache::MTIME_KEY;
use crate::cache::store::Entry;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Markdown,
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    /// Create a new render config with pretty option
    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// Freshness of a cached entry relative to its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
    Missing,
}

/// One row of command output: a cached (or just generated) entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub section: String,
    pub title: String,

    /// Raw mtime stamp as stored in the cache (seconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<f64>,

    /// The stamp as a UTC timestamp, for human consumption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Freshness>,

    /// Caller-defined payload fields, flattened into the output object
    #[serde(flatten)]
    pub fields: Entry,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntryView {
    /// Build a view from a cached entry, lifting the reserved mtime stamp out
    /// of the payload fields.
    pub fn from_entry(section: &str, title: &str, entry: &Entry) -> Self {
        let mut fields = entry.clone();
        let mtime = fields.remove(MTIME_KEY).and_then(|v| v.as_f64());
        let modified = mtime.and_then(|secs| DateTime::from_timestamp(secs as i64, 0));

        Self {
            section: section.to_string(),
            title: title.to_string(),
            mtime,
            modified,
            freshness: None,
            fields,
            error: None,
        }
    }

    /// Build an error view for a title whose generation failed.
    pub fn error(section: &str, title: &str, message: String) -> Self {
        Self {
            section: section.to_string(),
            title: title.to_string(),
            mtime: None,
            modified: None,
            freshness: None,
            fields: Entry::new(),
            error: Some(message),
        }
    }

    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = Some(freshness);
        self
    }
}

/// Renderer for entry views
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Create a new renderer with render config
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render views to a string
    pub fn render(&self, views: &[EntryView]) -> String {
        match self.config.format {
            OutputFormat::Jsonl => self.render_jsonl(views),
            OutputFormat::Json => self.render_json(views),
            OutputFormat::Markdown => self.render_markdown(views),
            OutputFormat::Raw => self.render_raw(views),
        }
    }

    /// Render as JSON Lines (one JSON object per line)
    fn render_jsonl(&self, views: &[EntryView]) -> String {
        views
            .iter()
            .filter_map(|view| {
                if self.config.pretty {
                    serde_json::to_string_pretty(view).ok()
                } else {
                    serde_json::to_string(view).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    /// Render as a single JSON array
    fn render_json(&self, views: &[EntryView]) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(views).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(views).unwrap_or_else(|_| "[]".to_string())
        }
    }

    /// Render as Markdown
    fn render_markdown(&self, views: &[EntryView]) -> String {
        let mut output = String::new();

        let (errors, entries): (Vec<_>, Vec<_>) = views.iter().partition(|v| v.error.is_some());

        if !errors.is_empty() {
            output.push_str("## Errors\n\n");
            for view in &errors {
                let message = view.error.as_deref().unwrap_or("unknown error");
                output.push_str(&format!("- `{}`: {}\n", view.title, message.red()));
            }
            output.push('\n');
        }

        if !entries.is_empty() {
            output.push_str("## Entries\n\n");
            for view in &entries {
                self.render_entry_md(&mut output, view);
            }
        }

        output
    }

    fn render_entry_md(&self, output: &mut String, view: &EntryView) {
        output.push_str(&format!("- `{}` [{}]", view.title, view.section));

        if let Some(digest) = view.fields.get("digest").and_then(|v| v.as_str()) {
            output.push_str(&format!(" {}", digest));
        }
        if let Some(modified) = &view.modified {
            output.push_str(&format!(
                " (modified {})",
                modified.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        match view.freshness {
            Some(Freshness::Fresh) => output.push_str(&format!(" {}", "fresh".green())),
            Some(Freshness::Stale) => output.push_str(&format!(" {}", "stale".yellow())),
            Some(Freshness::Missing) => {
                output.push_str(&format!(" {}", "source missing".red()))
            }
            None => {}
        }

        output.push('\n');
    }

    /// Render as raw digest lines, sha1sum-style: `<digest>  <title>`
    fn render_raw(&self, views: &[EntryView]) -> String {
        views
            .iter()
            .filter_map(|view| {
                view.fields
                    .get("digest")
                    .and_then(|d| d.as_str())
                    .map(|digest| format!("{}  {}", digest, view.title))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
