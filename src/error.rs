//! Error taxonomy for the workflow
//!
//! Every failure a component can surface is a variant here. Display text is
//! written to be shown to the user as-is; callers attach context but never
//! suppress.

use crate::publish::PublishStep;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid session token.
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// Non-2xx reply from the GitHub API.
    #[error("GitHub API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// File exceeds the display limit; checked against the reported size
    /// before any decode attempt.
    #[error("File is too large to display (>1MB): {path} is {size} bytes")]
    FileTooLarge { path: String, size: u64 },

    /// Content that could not be base64/UTF-8 decoded.
    #[error("Could not decode file content: {0}")]
    Decode(String),

    /// Every model in the fallback list failed.
    #[error("{}", fmt_all_models_failed(.attempted_models, .last_error, .suggestion))]
    AllModelsFailed {
        attempted_models: Vec<String>,
        last_error: String,
        suggestion: Option<String>,
    },

    /// The provider's reply was not valid JSON by any recovery strategy.
    /// Carries the raw text for diagnostics.
    #[error("AI response could not be parsed as JSON. Response preview: {}", crate::util::truncate_str(.raw, 200))]
    UnparsableResponse { raw: String },

    #[error("Please select files to analyze")]
    NoFilesSelected,

    #[error("Original file content not found")]
    OriginFileNotFound,

    /// Content-policy refusal. Returned immediately, never retried on
    /// another model.
    #[error("Request was blocked by the provider's safety filters: {0}")]
    SafetyBlocked(String),

    /// A step of the publish sequence failed. Prior steps are not undone.
    #[error("{}: {message}", step.describe())]
    SequenceStep { step: PublishStep, message: String },

    /// The provider API key is absent; no call was attempted.
    #[error("AI provider is not configured. Set the provider API key to enable test generation.")]
    NotConfigured,

    /// Transport-level failure before any HTTP status was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

fn fmt_all_models_failed(
    attempted: &[String],
    last_error: &str,
    suggestion: &Option<String>,
) -> String {
    let mut msg = format!(
        "All models failed (attempted: {}). Last error: {}",
        attempted.join(", "),
        last_error
    );
    if let Some(s) = suggestion {
        msg.push_str(" Suggestion: ");
        msg.push_str(s);
    }
    msg
}
