//! Streaming output writers: HTML list, CSV, JSON array, NDJSON, and plain text.
//! Each writer consumes records one at a time and never buffers the whole sequence.

use crate::model::{html_escape, LinkRecord};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Title used by the HTML writer when none is configured.
pub const DEFAULT_TITLE: &str = "Links";

/// Output format selector shared by the CLI and the HTTP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Csv,
    Json,
    Ndjson,
    Txt,
}

/// Errors from format selection and the writers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Unknown output format: '{0}'. Use html, csv, json, ndjson, or txt.")]
    UnknownFormat(String),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Html,
        OutputFormat::Csv,
        OutputFormat::Json,
        OutputFormat::Ndjson,
        OutputFormat::Txt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Txt => "txt",
        }
    }

    pub fn extension(self) -> &'static str {
        self.name()
    }

    /// MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html; charset=utf-8",
            OutputFormat::Csv => "text/csv; charset=utf-8",
            OutputFormat::Json => "application/json",
            OutputFormat::Ndjson => "application/x-ndjson",
            OutputFormat::Txt => "text/plain; charset=utf-8",
        }
    }

    /// Write `items` to `w` in this format. Returns the number of records written.
    /// `title` is only used by HTML.
    pub fn write_stream<I, W>(self, items: I, w: &mut W, title: &str) -> Result<usize, FormatError>
    where
        I: IntoIterator<Item = LinkRecord>,
        W: Write,
    {
        match self {
            OutputFormat::Html => write_html_stream(items, w, title),
            OutputFormat::Csv => write_csv_stream(items, w),
            OutputFormat::Json => write_json_array_stream(items, w),
            OutputFormat::Ndjson => write_ndjson_stream(items, w),
            OutputFormat::Txt => write_txt_stream(items, w),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "ndjson" | "jsonl" => Ok(OutputFormat::Ndjson),
            "txt" | "text" => Ok(OutputFormat::Txt),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// `<ul>` of anchors. Labels are already escaped by the generator; URLs are escaped here.
pub fn write_html_stream<I, W>(items: I, w: &mut W, title: &str) -> Result<usize, FormatError>
where
    I: IntoIterator<Item = LinkRecord>,
    W: Write,
{
    write!(
        w,
        "<!doctype html>\n<html lang='pt-BR'>\n<head>\n<meta charset='utf-8'>\n"
    )?;
    write!(
        w,
        "<title>{}</title>\n</head>\n<body>\n<ul>\n",
        html_escape(title)
    )?;
    let mut count = 0;
    for rec in items {
        writeln!(
            w,
            r#"  <li><a href="{}">{}</a></li>"#,
            html_escape(&rec.url),
            rec.label
        )?;
        count += 1;
    }
    write!(w, "</ul>\n</body>\n</html>\n")?;
    Ok(count)
}

/// Header `n,url,label`, minimal quoting, CRLF line endings.
pub fn write_csv_stream<I, W>(items: I, w: &mut W) -> Result<usize, FormatError>
where
    I: IntoIterator<Item = LinkRecord>,
    W: Write,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(&mut *w);
    writer.write_record(["n", "url", "label"])?;
    let mut count = 0;
    for rec in items {
        let n = rec.n.to_string();
        writer.write_record([n.as_str(), rec.url.as_str(), rec.label.as_str()])?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// One JSON object per line.
pub fn write_ndjson_stream<I, W>(items: I, w: &mut W) -> Result<usize, FormatError>
where
    I: IntoIterator<Item = LinkRecord>,
    W: Write,
{
    let mut count = 0;
    for rec in items {
        serde_json::to_writer(&mut *w, &rec)?;
        w.write_all(b"\n")?;
        count += 1;
    }
    Ok(count)
}

/// `[`, objects separated by `,\n`, `]`. Valid JSON without collecting the records.
pub fn write_json_array_stream<I, W>(items: I, w: &mut W) -> Result<usize, FormatError>
where
    I: IntoIterator<Item = LinkRecord>,
    W: Write,
{
    w.write_all(b"[\n")?;
    let mut count = 0;
    for rec in items {
        if count > 0 {
            w.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut *w, &rec)?;
        count += 1;
    }
    w.write_all(b"\n]\n")?;
    Ok(count)
}

/// `label -> url` per line.
pub fn write_txt_stream<I, W>(items: I, w: &mut W) -> Result<usize, FormatError>
where
    I: IntoIterator<Item = LinkRecord>,
    W: Write,
{
    let mut count = 0;
    for rec in items {
        writeln!(w, "{} -> {}", rec.label, rec.url)?;
        count += 1;
    }
    Ok(count)
}
