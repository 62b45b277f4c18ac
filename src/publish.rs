//! Publish-as-pull-request sequencer
//!
//! Turns a generated test into an open pull request through a strict
//! sequence of gateway calls: default branch, head SHA, new branch, test
//! file commit, pull request. The sequence is not transactional. A failure
//! aborts immediately and prior steps are not undone, so an orphaned
//! branch or committed file can remain. Each failure is tagged with the
//! step that raised it.

use crate::error::{Error, Result};
use crate::github::SourceHost;
use crate::pipeline::TestCase;
use tracing::info;

// ============================================================================
// Steps
// ============================================================================

/// The remote steps of the publish sequence, in order. Computing the test
/// file path happens between branch creation and the commit but is local
/// and cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    RepoInfo,
    BranchRef,
    CreateBranch,
    CommitFile,
    OpenPr,
}

impl PublishStep {
    pub fn describe(&self) -> &'static str {
        match self {
            PublishStep::RepoInfo => "Failed to get repo info",
            PublishStep::BranchRef => "Failed to get branch reference",
            PublishStep::CreateBranch => "Failed to create branch",
            PublishStep::CommitFile => "Failed to create test file",
            PublishStep::OpenPr => "Failed to create PR",
        }
    }
}

fn at_step(step: PublishStep) -> impl FnOnce(Error) -> Error {
    move |err| Error::SequenceStep {
        step,
        message: err.to_string(),
    }
}

// ============================================================================
// State
// ============================================================================

/// The sequencer is the only writer of pull request state.
#[derive(Debug, Default)]
pub struct PublishState {
    pr_url: Option<String>,
}

impl PublishState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pr_url(&self) -> Option<&str> {
        self.pr_url.as_deref()
    }

    pub fn set_pr_url(&mut self, url: String) {
        self.pr_url = Some(url);
    }

    pub fn clear(&mut self) {
        self.pr_url = None;
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// Run the full publish sequence and return the pull request URL.
pub async fn publish(
    host: &dyn SourceHost,
    token: &str,
    owner: &str,
    repo: &str,
    test: &TestCase,
) -> Result<String> {
    let default_branch = host
        .get_default_branch(token, owner, repo)
        .await
        .map_err(at_step(PublishStep::RepoInfo))?;

    let base_sha = host
        .get_branch_head_sha(token, owner, repo, &default_branch)
        .await
        .map_err(at_step(PublishStep::BranchRef))?;

    // The timestamp keeps branch names unique across publishes. A collision
    // fails the create call and is surfaced, not retried.
    let timestamp = chrono::Utc::now().timestamp_millis();
    let branch_name = format!("add-test-{}", timestamp);
    host.create_branch(token, owner, repo, &branch_name, &base_sha)
        .await
        .map_err(at_step(PublishStep::CreateBranch))?;

    let path = test_file_path(test.file_path.as_deref(), timestamp);
    let message = format!("Add test: {}", test.description);
    host.commit_file(token, owner, repo, &path, &test.code, &branch_name, &message)
        .await
        .map_err(at_step(PublishStep::CommitFile))?;

    let title = format!("Add {} test: {}", test.kind, test.description);
    let body = pr_body(test, &path);
    let url = host
        .open_pull_request(
            token,
            owner,
            repo,
            &branch_name,
            &default_branch,
            &title,
            &body,
        )
        .await
        .map_err(at_step(PublishStep::OpenPr))?;

    info!(%url, branch = %branch_name, "pull request opened");
    Ok(url)
}

/// Destination path for the test file, derived from the origin file's
/// name and extension. Tests without an origin path get a generic
/// timestamped spec under `tests/`.
pub fn test_file_path(origin: Option<&str>, timestamp: i64) -> String {
    let Some(origin) = origin else {
        return format!("tests/test-{}.spec.js", timestamp);
    };

    let file_name = origin.rsplit('/').next().unwrap_or(origin);
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (file_name, ""),
    };

    match ext {
        "js" | "jsx" => format!("tests/{}.test.js", stem),
        "ts" | "tsx" => format!("tests/{}.test.ts", stem),
        "py" => format!("tests/test_{}.py", stem),
        "java" => format!("src/test/java/{}Test.java", stem),
        _ => format!("tests/{}.test.{}", stem, ext),
    }
}

fn pr_body(test: &TestCase, test_path: &str) -> String {
    let origin_line = match &test.file_path {
        Some(path) => format!("**Original File:** {}\n", path),
        None => String::new(),
    };
    format!(
        "## Automated Test Case\n\n\
         **Description:** {}\n\n\
         **Test Type:** {}\n\
         **Framework:** {}\n\
         {}\n\
         ---\n\n\
         This test case was automatically generated. Please review the test logic and modify as needed before merging.\n\n\
         ### Generated Test File\n\
         `{}`",
        test.description, test.kind, test.framework, origin_line, test_path
    )
}
