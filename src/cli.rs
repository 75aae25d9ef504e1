//! CLI parsing and orchestration. Parses args, validates the request, then streams links
//! to stdout or a file. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::formats::{FormatError, OutputFormat, DEFAULT_TITLE};
use crate::generator::{generate_links, GenerateError, LinkRequest, Limits, DEFAULT_LABEL_TEMPLATE};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("Cannot create {}: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Generate(_) => 2,
            CliRunError::Format(_) | CliRunError::CreateFile { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chapterlinks")]
#[command(about = "Generate numbered chapter links as HTML, CSV, JSON, NDJSON, or text")]
#[command(
    after_help = "Config file keys (label_template, format, title, max_range) are read from ./chapterlinks.toml or ~/.config/chapterlinks/config.toml. CLI flags override config."
)]
pub struct Args {
    /// URL template. Use {n}, {n:03d}, or {} as the placeholder. http:// is added when no scheme is given.
    #[arg(short, long)]
    pub url: String,

    /// First sequence number (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub start: i64,

    /// Last sequence number (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub end: i64,

    /// Zero-pad bare {n} fields to this many digits. Ignored when a field has its own format spec.
    #[arg(long, default_value_t = 0)]
    pub pad: usize,

    /// Increment between sequence numbers (>= 1).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub step: i64,

    /// Label template (default: "Capítulo {n}").
    #[arg(long)]
    pub label_template: Option<String>,

    /// Output format: html (default), csv, json, ndjson, or txt.
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// HTML page title (default: "Links").
    #[arg(long)]
    pub title: Option<String>,

    /// Output file. Omit to print to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reject ranges with more than this many entries (end - start + 1).
    #[arg(long, env = "MAX_RANGE")]
    pub max_range: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain and debug logs.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Settings after merging flags over config over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
    format: OutputFormat,
    label_template: String,
    title: String,
    max_range: Option<u64>,
}

fn resolve(args: &Args, config: Option<&Config>) -> Result<Resolved, CliRunError> {
    let format = match args.format {
        Some(f) => f,
        None => match config.and_then(|c| c.format.as_deref()) {
            Some(name) => name.parse::<OutputFormat>().map_err(|e: FormatError| {
                CliRunError::InvalidInput(format!("Invalid format in config: {}", e))
            })?,
            None => OutputFormat::Html,
        },
    };
    let label_template = args
        .label_template
        .clone()
        .or_else(|| config.and_then(|c| c.label_template.clone()))
        .unwrap_or_else(|| DEFAULT_LABEL_TEMPLATE.to_string());
    let title = args
        .title
        .clone()
        .or_else(|| config.and_then(|c| c.title.clone()))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let max_range = args.max_range.or_else(|| config.and_then(|c| c.max_range));
    Ok(Resolved {
        format,
        label_template,
        title,
        max_range,
    })
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    bar.set_message("Writing links");
    bar
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve(args, config.as_ref())?;

    let request = LinkRequest {
        url_template: args.url.clone(),
        start: args.start,
        end: args.end,
        pad: args.pad,
        step: args.step,
        label_template: settings.label_template.clone(),
    };
    let limits = Limits {
        max_range: settings.max_range,
    };
    let links = generate_links(&request, &limits)?;

    let Some(output_path) = &args.output else {
        let stdout = std::io::stdout();
        let mut w = BufWriter::new(stdout.lock());
        settings.format.write_stream(links, &mut w, &settings.title)?;
        w.flush().map_err(FormatError::from)?;
        return Ok(());
    };

    validate_output_path(output_path)?;
    let file = File::create(output_path).map_err(|e| CliRunError::CreateFile {
        path: output_path.clone(),
        source: e,
    })?;
    let mut w = BufWriter::new(file);

    let bar = (!args.quiet).then(|| progress_bar(links.len() as u64));
    let items = links.inspect(|_| {
        if let Some(pb) = &bar {
            pb.inc(1);
        }
    });
    let written = settings.format.write_stream(items, &mut w, &settings.title)?;
    w.flush().map_err(FormatError::from)?;
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
    tracing::debug!(written, format = %settings.format, path = %output_path.display(), "output written");

    if !args.quiet {
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}
