//! Normalized provider reply and failure classification.

use serde::Deserialize;

/// Hard ceiling on completion tokens regardless of what the caller asks for.
pub const MAX_COMPLETION_TOKENS: u32 = 4000;

/// Clamp a requested token budget to the provider ceiling.
pub fn clamp_max_tokens(requested: u32) -> u32 {
    requested.min(MAX_COMPLETION_TOKENS)
}

/// Strict internal result of a text-generation call. Built only from a
/// validated provider reply.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub result: String,
    pub model_used: String,
    pub tokens_used: Option<u32>,
}

/// Token accounting as reported by the provider.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: u32,
}

/// How a single model attempt failed, which decides whether the fallback
/// loop continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limit or quota exhaustion; the next model is tried.
    Quota,
    /// Content-policy refusal; aborts the loop immediately.
    Safety,
    /// Anything else; the next model is still tried.
    Other,
}

/// Classify a failed attempt from its HTTP status and body text.
pub fn classify_failure(status: Option<u16>, text: &str) -> FailureKind {
    let lower = text.to_lowercase();
    if lower.contains("content policy")
        || lower.contains("content_policy")
        || lower.contains("safety system")
        || lower.contains("blocked by safety")
    {
        return FailureKind::Safety;
    }
    if status == Some(429) || lower.contains("429") || lower.contains("quota") {
        return FailureKind::Quota;
    }
    FailureKind::Other
}

/// A suggestion string for the final diagnostic, when the failure text gives
/// the operator something actionable.
pub fn suggestion_for(last_error: &str) -> Option<String> {
    let lower = last_error.to_lowercase();
    if lower.contains("does not exist") || lower.contains("model_not_found") {
        return Some(
            "One or more configured models are unavailable. Update the model priority list in the config file.".to_string(),
        );
    }
    if lower.contains("quota") || lower.contains("429") {
        return Some("Provider quota exhausted. Check your plan and billing details.".to_string());
    }
    None
}
