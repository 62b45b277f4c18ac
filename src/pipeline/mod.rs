//! Two-stage test generation pipeline
//!
//! Stage A (`summarize`) sends the selected files to the AI gateway and
//! parses a list of suggested test cases. Stage B (`generate`) turns one
//! chosen suggestion into full test code and normalizes it for display and
//! commit. `PipelineState` holds the settings and the accumulated results.

pub mod clean;
mod parse;
mod prompts;

pub use clean::clean_code_response;

use crate::ai::TextGenerator;
use crate::error::{Error, Result};
use crate::github::FileContent;
use serde::{Deserialize, Serialize};
use tracing::info;

// ════════════════════════════════════════════════════════════════════════
//  TYPES
// ════════════════════════════════════════════════════════════════════════

/// Category of test being suggested or generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    #[default]
    Unit,
    Integration,
    E2e,
    Ui,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::Integration => "integration",
            TestKind::E2e => "e2e",
            TestKind::Ui => "ui",
        }
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Suggested,
    Generated,
}

/// A stage-A suggestion: what to test, not yet how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSummary {
    pub id: String,
    pub description: String,
    pub kind: TestKind,
    pub framework: String,
    /// Repo-relative path of the file this suggestion targets, when the
    /// model named one.
    pub file_path: Option<String>,
}

/// A stage-B result: a summary plus its generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    pub code: String,
    pub kind: TestKind,
    pub status: TestStatus,
    pub framework: String,
    pub file_path: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════
//  STATE
// ════════════════════════════════════════════════════════════════════════

/// Pipeline settings and accumulated results.
#[derive(Debug)]
pub struct PipelineState {
    summaries: Vec<TestCaseSummary>,
    tests: Vec<TestCase>,
    framework: String,
    kind: TestKind,
    latest: Option<TestCase>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            summaries: Vec::new(),
            tests: Vec::new(),
            framework: "jest".to_string(),
            kind: TestKind::Unit,
            latest: None,
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn set_framework(&mut self, framework: impl Into<String>) {
        self.framework = framework.into();
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: TestKind) {
        self.kind = kind;
    }

    pub fn summaries(&self) -> &[TestCaseSummary] {
        &self.summaries
    }

    pub fn set_summaries(&mut self, summaries: Vec<TestCaseSummary>) {
        self.summaries = summaries;
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// The most recently generated test, independent of dedupe.
    pub fn latest(&self) -> Option<&TestCase> {
        self.latest.as_ref()
    }

    /// Record a generated test. Regenerating a summary keeps the first
    /// result in the list but still updates `latest`.
    pub fn record_test(&mut self, test: TestCase) {
        if !self.tests.iter().any(|t| t.id == test.id) {
            self.tests.push(test.clone());
        }
        self.latest = Some(test);
    }

    /// Drop all suggestions and generated tests. Framework and kind
    /// settings survive.
    pub fn clear(&mut self) {
        self.summaries.clear();
        self.tests.clear();
        self.latest = None;
    }
}

// ════════════════════════════════════════════════════════════════════════
//  STAGES
// ════════════════════════════════════════════════════════════════════════

/// Stage A: suggest test cases for the given files.
///
/// Binary files are excluded up front; if nothing textual remains the call
/// is rejected before any AI request is made. Summaries missing an id or
/// framework get deterministic fallbacks.
pub async fn summarize(
    generator: &dyn TextGenerator,
    files: &[FileContent],
    framework: &str,
    kind: TestKind,
) -> Result<Vec<TestCaseSummary>> {
    let textual: Vec<&FileContent> = files.iter().filter(|f| !f.binary).collect();
    if textual.is_empty() {
        return Err(Error::NoFilesSelected);
    }

    let prompt = prompts::summary_prompt(&textual, framework, kind);
    let reply = generator
        .generate_text(&prompt, prompts::PIPELINE_MAX_TOKENS)
        .await?;
    info!(model = %reply.model_used, files = textual.len(), "received test suggestions");

    let raw = parse::parse_summary_array(&reply.result)?;
    let millis = chrono::Utc::now().timestamp_millis();
    let summaries = raw
        .into_iter()
        .enumerate()
        .map(|(index, item)| TestCaseSummary {
            id: item
                .id
                .unwrap_or_else(|| format!("summary-{}-{}", millis, index)),
            description: item.description,
            kind: item.kind.unwrap_or(kind),
            framework: item.framework.unwrap_or_else(|| framework.to_string()),
            file_path: item.file_path,
        })
        .collect();
    Ok(summaries)
}

/// Stage B: generate full test code for one summary.
///
/// The summary's origin file must still be reachable, either among the
/// selected files or as the currently viewed file. The prompt then covers
/// the whole selection (or the viewed file when nothing is selected), same
/// as stage A.
pub async fn generate(
    generator: &dyn TextGenerator,
    summary: &TestCaseSummary,
    selected: &[FileContent],
    viewed: Option<&FileContent>,
    framework: &str,
    kind: TestKind,
) -> Result<TestCase> {
    let origin = selected
        .iter()
        .find(|f| Some(f.path.as_str()) == summary.file_path.as_deref())
        .or(viewed);
    if origin.is_none() {
        return Err(Error::OriginFileNotFound);
    }

    let context: Vec<&FileContent> = if selected.is_empty() {
        viewed.into_iter().collect()
    } else {
        selected.iter().collect()
    };

    let prompt = prompts::code_prompt(&summary.description, &context, framework, kind);
    let reply = generator
        .generate_text(&prompt, prompts::PIPELINE_MAX_TOKENS)
        .await?;
    info!(model = %reply.model_used, summary = %summary.id, "generated test code");

    Ok(TestCase {
        id: summary.id.clone(),
        description: summary.description.clone(),
        code: clean_code_response(&reply.result),
        kind: summary.kind,
        status: TestStatus::Generated,
        framework: summary.framework.clone(),
        file_path: summary.file_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerateReply;
    use async_trait::async_trait;

    struct CannedGenerator {
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate_text(&self, _prompt: &str, _max_tokens: u32) -> Result<GenerateReply> {
            Ok(GenerateReply {
                result: self.reply.clone(),
                model_used: "gpt-4.1".to_string(),
                tokens_used: Some(42),
            })
        }
    }

    fn file(path: &str, content: &str, binary: bool) -> FileContent {
        FileContent {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            content: content.to_string(),
            binary,
        }
    }

    fn summary(id: &str, file_path: Option<&str>) -> TestCaseSummary {
        TestCaseSummary {
            id: id.to_string(),
            description: "checks addition".to_string(),
            kind: TestKind::Unit,
            framework: "jest".to_string(),
            file_path: file_path.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_summarize_rejects_empty_selection() {
        let generator = CannedGenerator {
            reply: "[]".to_string(),
        };
        let err = summarize(&generator, &[], "jest", TestKind::Unit)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoFilesSelected));
    }

    #[tokio::test]
    async fn test_summarize_rejects_all_binary_selection() {
        let generator = CannedGenerator {
            reply: "[]".to_string(),
        };
        let files = vec![file("logo.png", "Binary file: logo.png (512 bytes)", true)];
        let err = summarize(&generator, &files, "jest", TestKind::Unit)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoFilesSelected));
    }

    #[tokio::test]
    async fn test_summarize_fills_missing_ids_and_framework() {
        let generator = CannedGenerator {
            reply: r#"[{"description":"first"},{"description":"second","id":"given","framework":"mocha"}]"#
                .to_string(),
        };
        let files = vec![file("src/add.ts", "export const add = 1;", false)];
        let summaries = summarize(&generator, &files, "jest", TestKind::Integration)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].id.starts_with("summary-"));
        assert!(summaries[0].id.ends_with("-0"));
        assert_eq!(summaries[0].framework, "jest");
        assert_eq!(summaries[0].kind, TestKind::Integration);
        assert_eq!(summaries[1].id, "given");
        assert_eq!(summaries[1].framework, "mocha");
    }

    #[tokio::test]
    async fn test_generate_requires_reachable_origin() {
        let generator = CannedGenerator {
            reply: "test('x', () => {});".to_string(),
        };
        let err = generate(
            &generator,
            &summary("s1", Some("src/gone.ts")),
            &[],
            None,
            "jest",
            TestKind::Unit,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::OriginFileNotFound));
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_viewed_file() {
        let generator = CannedGenerator {
            reply: "```javascript\ntest('x', () => {});\n```".to_string(),
        };
        let viewed = file("src/add.ts", "export const add = 1;", false);
        let test = generate(
            &generator,
            &summary("s1", Some("src/other.ts")),
            &[],
            Some(&viewed),
            "jest",
            TestKind::Unit,
        )
        .await
        .unwrap();
        assert_eq!(test.code, "test('x', () => {});");
        assert_eq!(test.status, TestStatus::Generated);
        assert_eq!(test.id, "s1");
    }

    #[test]
    fn test_record_test_dedupes_by_id_but_tracks_latest() {
        let mut state = PipelineState::new();
        let first = TestCase {
            id: "t1".to_string(),
            description: "first".to_string(),
            code: "a();".to_string(),
            kind: TestKind::Unit,
            status: TestStatus::Generated,
            framework: "jest".to_string(),
            file_path: None,
        };
        let regenerated = TestCase {
            code: "b();".to_string(),
            ..first.clone()
        };
        state.record_test(first.clone());
        state.record_test(regenerated.clone());
        assert_eq!(state.tests().len(), 1);
        assert_eq!(state.tests()[0].code, "a();");
        assert_eq!(state.latest().unwrap().code, "b();");
    }

    #[test]
    fn test_clear_keeps_settings() {
        let mut state = PipelineState::new();
        state.set_framework("pytest");
        state.set_kind(TestKind::E2e);
        state.set_summaries(vec![summary("s1", None)]);
        state.clear();
        assert!(state.summaries().is_empty());
        assert!(state.tests().is_empty());
        assert!(state.latest().is_none());
        assert_eq!(state.framework(), "pytest");
        assert_eq!(state.kind(), TestKind::E2e);
    }
}
