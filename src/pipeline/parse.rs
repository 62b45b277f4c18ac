//! Parsing of the stage-A summary response.
//!
//! Models are told to answer with a bare JSON array but frequently wrap it
//! in markdown fences or preamble text, so parsing tries the raw text
//! first, then the fence-stripped text, then the bracketed fragment.

use super::TestKind;
use crate::error::{Error, Result};
use serde::Deserialize;

/// One summary as the model emits it. Everything but the description is
/// optional; callers fill the gaps.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TestKind>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(rename = "filePath", default)]
    pub file_path: Option<String>,
}

/// Strip markdown code fences from a response.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = if clean.ends_with("```") {
        clean.strip_suffix("```").unwrap_or(clean)
    } else {
        clean
    };
    clean.trim()
}

/// Extract the outermost `[...]` fragment, if any.
fn extract_array_fragment(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

pub(crate) fn parse_summary_array(response: &str) -> Result<Vec<RawSummary>> {
    if let Ok(parsed) = serde_json::from_str(response) {
        return Ok(parsed);
    }
    let clean = strip_markdown_fences(response);
    if let Ok(parsed) = serde_json::from_str(clean) {
        return Ok(parsed);
    }
    if let Some(fragment) = extract_array_fragment(clean) {
        if let Ok(parsed) = serde_json::from_str(fragment) {
            return Ok(parsed);
        }
    }
    Err(Error::UnparsableResponse {
        raw: response.to_string(),
    })
}
