//! chapterlinks: generate numbered chapter links from a URL template as HTML, CSV, JSON,
//! NDJSON, or plain text. Exposed as a CLI and as a Basic-auth HTTP endpoint.

pub mod cli;
pub mod config;
pub mod formats;
pub mod generator;
pub mod logging;
pub mod model;
pub mod server;
pub mod template;

// Re-exports for the binaries and library consumers.
pub use formats::{FormatError, OutputFormat};
pub use generator::{generate_links, GenerateError, LinkRequest, Limits, Links};
pub use model::LinkRecord;
pub use template::{
    build_url, ensure_scheme, safe_format, validate_template, Template, TemplateError,
};
