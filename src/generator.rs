//! Link generation: validates a request up front, then yields records lazily.

use crate::model::{html_escape, LinkRecord};
use crate::template::{Template, TemplateError, UrlTemplate};
use thiserror::Error;

/// Default label when none is given.
pub const DEFAULT_LABEL_TEMPLATE: &str = "Capítulo {n}";

/// Largest accepted `pad`.
pub const MAX_PAD: usize = 64;

/// Errors raised before any record is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("start must be <= end (got start={start}, end={end})")]
    StartAfterEnd { start: i64, end: i64 },

    #[error("step must be >= 1 (got {0})")]
    InvalidStep(i64),

    #[error("pad must be <= {max} (got {pad})")]
    PadTooLarge { pad: usize, max: usize },

    #[error("Range too large: {size} entries (max {max})")]
    RangeTooLarge { size: u64, max: u64 },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub url_template: String,
    pub start: i64,
    pub end: i64,
    /// Zero-pad width for fields without their own spec. 0 disables padding.
    pub pad: usize,
    pub step: i64,
    pub label_template: String,
}

impl LinkRequest {
    pub fn new(url_template: impl Into<String>, start: i64, end: i64) -> Self {
        LinkRequest {
            url_template: url_template.into(),
            start,
            end,
            pad: 0,
            step: 1,
            label_template: DEFAULT_LABEL_TEMPLATE.to_string(),
        }
    }
}

/// Abuse limits applied before generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum `end - start + 1`. `None` means unlimited.
    pub max_range: Option<u64>,
}

/// Lazy sequence of records for one request.
#[derive(Debug, Clone)]
pub struct Links {
    url: UrlTemplate,
    label: Template,
    pad: usize,
    step: i64,
    next: Option<i64>,
    remaining: usize,
}

impl Iterator for Links {
    type Item = LinkRecord;

    fn next(&mut self) -> Option<LinkRecord> {
        if self.remaining == 0 {
            return None;
        }
        let n = self.next?;
        self.remaining -= 1;
        self.next = n.checked_add(self.step);
        Some(LinkRecord {
            n,
            url: self.url.render(n, self.pad),
            label: html_escape(&self.label.render(n, self.pad)),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Links {}

/// Number of records for a validated range: `floor((end - start) / step) + 1`.
pub fn record_count(start: i64, end: i64, step: i64) -> u64 {
    let span = (end as i128 - start as i128) as u128;
    (span / step as u128) as u64 + 1
}

/// Validate `request` against `limits` and return the record iterator.
///
/// Every rejection (range, step, pad, template) happens here, so callers can write
/// output headers only after this returns `Ok`.
pub fn generate_links(request: &LinkRequest, limits: &Limits) -> Result<Links, GenerateError> {
    let LinkRequest {
        start, end, step, pad, ..
    } = *request;
    if start > end {
        return Err(GenerateError::StartAfterEnd { start, end });
    }
    if step < 1 {
        return Err(GenerateError::InvalidStep(step));
    }
    if pad > MAX_PAD {
        return Err(GenerateError::PadTooLarge { pad, max: MAX_PAD });
    }
    let size = u64::try_from(end as i128 - start as i128 + 1).unwrap_or(u64::MAX);
    if let Some(max) = limits.max_range {
        if size > max {
            tracing::warn!(size, max, "range rejected");
            return Err(GenerateError::RangeTooLarge { size, max });
        }
    }

    let label = Template::parse(&request.label_template)?;
    let url = UrlTemplate::parse(&request.url_template)?;

    let count = record_count(start, end, step);
    let remaining = usize::try_from(count).unwrap_or(usize::MAX);
    tracing::debug!(start, end, step, pad, count, "generating links");

    Ok(Links {
        url,
        label,
        pad,
        step,
        next: Some(start),
        remaining,
    })
}
