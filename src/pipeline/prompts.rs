//! Prompt construction for the two pipeline stages.

use super::TestKind;
use crate::github::FileContent;
use crate::util::truncate_content;

/// Token ceiling for both pipeline calls.
pub(crate) const PIPELINE_MAX_TOKENS: u32 = 2000;

/// Per-file character cap inside a prompt. Large files keep their head and
/// tail so the model still sees imports and exports.
const MAX_FILE_CHARS: usize = 2000;

/// Render the selected files as a single prompt block, one `File:` header
/// per file, separated by `---` rules.
fn files_block(files: &[&FileContent]) -> String {
    files
        .iter()
        .map(|f| format!("File: {}\n{}", f.path, truncate_content(&f.content, MAX_FILE_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Stage-A prompt: ask for test case suggestions as a JSON array.
pub(crate) fn summary_prompt(files: &[&FileContent], framework: &str, kind: TestKind) -> String {
    format!(
        "Analyze the following code files and suggest test cases. Framework: {framework}, Type: {kind}\n\n\
         {}\n\n\
         Provide test case suggestions in JSON format: \
         [{{\"id\": \"unique-id\", \"description\": \"test description\", \"type\": \"{kind}\", \
         \"framework\": \"{framework}\", \"filePath\": \"file/path.ts\"}}]",
        files_block(files)
    )
}

/// Stage-B prompt: ask for the full test code for one chosen summary.
pub(crate) fn code_prompt(
    description: &str,
    files: &[&FileContent],
    framework: &str,
    kind: TestKind,
) -> String {
    format!(
        "Generate complete test code for: {description}\n\
         Framework: {framework}, Type: {kind}\n\n\
         Code files:\n{}\n\n\
         Provide only the test code, no explanations.",
        files_block(files)
    )
}
