//! Error types for sluice-jinja

use thiserror::Error;

/// Templating errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// J001: minijinja rejected or failed to render the template
    #[error("[J001] Failed to render template: {0}")]
    Render(String),

    /// J002: the captured `config()` state was lost to a panic
    #[error("[J002] Captured model config is unavailable")]
    ConfigCapture,

    /// J003: a `config()` argument that cannot be flattened to text
    #[error("[J003] Invalid config value for '{key}': {reason}")]
    InvalidConfigValue { key: String, reason: String },

    /// J004: the template references a relation with no binding
    #[error("[J004] No relation bound for {reference}")]
    UnboundReference { reference: String },
}

pub type JinjaResult<T> = Result<T, JinjaError>;

impl From<minijinja::Error> for JinjaError {
    fn from(err: minijinja::Error) -> Self {
        // Keep the source chain; minijinja puts line info in `detail`
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(&format!(": {inner}"));
            source = inner.source();
        }
        JinjaError::Render(message)
    }
}
