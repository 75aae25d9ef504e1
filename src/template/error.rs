//! Template rejection reasons. Every variant is raised before any link is rendered.

use thiserror::Error;

/// Why a URL or label template was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Field other than `n`/`{}`, or any attribute/index access such as `{n.__class__}`.
    #[error("Forbidden or unsafe template field: '{field}'")]
    ForbiddenField { field: String },

    #[error("Nested replacement fields are not allowed in format spec '{spec}'")]
    NestedField { spec: String },

    #[error("Invalid template: {reason}")]
    Syntax { reason: String },

    #[error("Invalid format spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },
}
