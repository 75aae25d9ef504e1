//! Optional config file loading. Search order: ./chapterlinks.toml, then
//! $XDG_CONFIG_HOME/chapterlinks/config.toml (or ~/.config/chapterlinks/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file name looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "chapterlinks.toml";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Label template used when --label-template is not given.
    pub label_template: Option<String>,
    /// Output format used when --format is not given (html, csv, json, ndjson, txt).
    pub format: Option<String>,
    /// HTML page title.
    pub title: Option<String>,
    /// Maximum `end - start + 1` accepted per request.
    pub max_range: Option<u64>,
    /// Server bind address, e.g. "0.0.0.0:8080".
    pub bind: Option<String>,
    /// Basic auth user for the server.
    pub username: Option<String>,
    /// Basic auth password for the server.
    pub password: Option<String>,
}

/// Candidate config paths in search order.
pub fn config_paths() -> Result<Vec<PathBuf>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join(LOCAL_CONFIG_FILE)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("chapterlinks").join("config.toml"));
    }
    Ok(paths)
}

/// Read and parse one config file.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// First config found on the search path. Missing file returns Ok(None).
/// Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    for path in config_paths()? {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            return load_config_from(&path).map(Some);
        }
    }
    Ok(None)
}
