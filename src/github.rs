//! GitHub API gateway
//!
//! Thin typed wrappers around the repository/contents/git-refs/pulls
//! endpoints. Request shaping and status-code-to-error mapping only; no
//! business rules and no caching, so every call reflects live remote state.

use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.github.com";
const API_TIMEOUT_SECS: u64 = 60;

/// Reported size above which a file is rejected before any decode attempt.
const MAX_FILE_SIZE: u64 = 1_000_000;

/// Maximum length for error body content in error messages
const MAX_ERROR_BODY_LEN: usize = 200;

// ============================================================================
// Data model
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// A repository as listed for the signed-in user. Immutable once fetched;
/// the listing is replaced wholesale on each fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub owner: Option<RepoOwner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a directory listing, path relative to the repo root.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Decoded file content. `binary` files carry a sentinel string instead of
/// their raw bytes and are never fed to the AI pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub content: String,
    pub binary: bool,
}

// ============================================================================
// Gateway trait
// ============================================================================

/// The source-hosting side of the remote gateway. Behind a trait so the
/// browser and sequencer can be exercised against mocks.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn list_repositories(&self, token: &str) -> Result<Vec<Repository>>;

    /// List a directory, sorted directories-first then lexicographic.
    async fn list_directory(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>>;

    async fn read_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<FileContent>;

    async fn get_default_branch(&self, token: &str, owner: &str, repo: &str) -> Result<String>;

    async fn get_branch_head_sha(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<String>;

    /// Create a branch ref pointing at `from_sha`. Fails if the ref exists.
    async fn create_branch(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        new_name: &str,
        from_sha: &str,
    ) -> Result<()>;

    #[allow(clippy::too_many_arguments)]
    async fn commit_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        branch: &str,
        message: &str,
    ) -> Result<()>;

    /// Open a pull request and return its web URL.
    #[allow(clippy::too_many_arguments)]
    async fn open_pull_request(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String>;
}

// ============================================================================
// HTTP client
// ============================================================================

pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", "testforge")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn error_from_response(resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Error::RemoteApi {
            status,
            message: api_error_message(&body),
        }
    }
}

// Wire-format DTOs, private to this module.

#[derive(Deserialize)]
struct RepoInfoResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Serialize)]
struct CreateRefRequest {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
}

#[derive(Deserialize)]
struct ContentsFileResponse {
    name: String,
    path: String,
    size: u64,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct PutContentsRequest {
    message: String,
    content: String,
    branch: String,
}

#[derive(Serialize)]
struct CreatePrRequest {
    title: String,
    body: String,
    head: String,
    base: String,
}

#[derive(Deserialize)]
struct CreatePrResponse {
    html_url: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl SourceHost for GithubClient {
    async fn list_repositories(&self, token: &str) -> Result<Vec<Repository>> {
        let url = format!("{}/user/repos", self.api_base);
        debug!(%url, "listing repositories");
        let resp = self.request(reqwest::Method::GET, &url, token).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn list_directory(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, owner, repo, path
        );
        debug!(%url, "listing directory");
        let resp = self.request(reqwest::Method::GET, &url, token).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        // A file path returns an object instead of an array; callers branch
        // on the response shape by choosing read_file instead.
        let mut entries: Vec<DirectoryEntry> = resp.json().await?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn read_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<FileContent> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, owner, repo, path
        );
        debug!(%url, "reading file");
        let resp = self.request(reqwest::Method::GET, &url, token).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let file: ContentsFileResponse = resp.json().await?;
        if file.size > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                path: file.path,
                size: file.size,
            });
        }
        let encoded = file.content.unwrap_or_default();
        decode_file_content(&file.name, &file.path, file.size, &encoded)
    }

    async fn get_default_branch(&self, token: &str, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}/{}", self.api_base, owner, repo);
        let resp = self.request(reqwest::Method::GET, &url, token).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let info: RepoInfoResponse = resp.json().await?;
        Ok(info.default_branch)
    }

    async fn get_branch_head_sha(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/git/refs/heads/{}",
            self.api_base, owner, repo, branch
        );
        let resp = self.request(reqwest::Method::GET, &url, token).send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let r: RefResponse = resp.json().await?;
        Ok(r.object.sha)
    }

    async fn create_branch(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        new_name: &str,
        from_sha: &str,
    ) -> Result<()> {
        let url = format!("{}/repos/{}/{}/git/refs", self.api_base, owner, repo);
        debug!(branch = new_name, sha = from_sha, "creating branch");
        let request = CreateRefRequest {
            git_ref: format!("refs/heads/{}", new_name),
            sha: from_sha.to_string(),
        };
        let resp = self
            .request(reqwest::Method::POST, &url, token)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }

    async fn commit_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        branch: &str,
        message: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, owner, repo, path
        );
        debug!(%path, %branch, "committing file");
        let request = PutContentsRequest {
            message: message.to_string(),
            content: encode_content(content),
            branch: branch.to_string(),
        };
        let resp = self
            .request(reqwest::Method::PUT, &url, token)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }

    async fn open_pull_request(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_base, owner, repo);
        debug!(%head, %base, "opening pull request");
        let request = CreatePrRequest {
            title: title.to_string(),
            body: body.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        };
        let resp = self
            .request(reqwest::Method::POST, &url, token)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let pr: CreatePrResponse = resp.json().await?;
        Ok(pr.html_url)
    }
}

// ============================================================================
// Content encoding and classification
// ============================================================================

/// UTF-8-safe base64 encoding for commit payloads. Multi-byte characters
/// must round-trip byte-for-byte.
pub fn encode_content(content: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(content.as_bytes())
}

/// Decode a contents payload and classify it. GitHub wraps base64 at 60
/// columns, so whitespace is stripped before decoding.
pub fn decode_file_content(
    name: &str,
    path: &str,
    size: u64,
    encoded: &str,
) -> Result<FileContent> {
    let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(stripped.as_bytes())
        .map_err(|e| Error::Decode(format!("{}: {}", path, e)))?;

    if looks_binary(&bytes) {
        return Ok(FileContent {
            name: name.to_string(),
            path: path.to_string(),
            content: format!("Binary file: {} ({} bytes)", name, size),
            binary: true,
        });
    }

    let content =
        String::from_utf8(bytes).map_err(|e| Error::Decode(format!("{}: {}", path, e)))?;
    Ok(FileContent {
        name: name.to_string(),
        path: path.to_string(),
        content,
        binary: false,
    })
}

/// Sample the first ~1000 bytes for control characters, or high bytes that
/// do not form valid UTF-8.
fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(1000)];
    if sample
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0E..=0x1F | 0x7F))
    {
        return true;
    }
    if sample.iter().any(|&b| b >= 0x80) {
        // A multi-byte char may be cut at the sample boundary.
        return match std::str::from_utf8(sample) {
            Ok(_) => false,
            Err(e) => e.valid_up_to() + 4 < sample.len(),
        };
    }
    false
}

/// Directories sort before files, then lexicographic by name within kind.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.kind, b.kind) {
        (EntryKind::Dir, EntryKind::File) => std::cmp::Ordering::Less,
        (EntryKind::File, EntryKind::Dir) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

// ============================================================================
// Error-body handling
// ============================================================================

/// Extract a readable message from a GitHub error body: structured
/// `{message, errors}` first, sanitized raw text otherwise.
fn api_error_message(body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        let detail = api_error
            .errors
            .first()
            .and_then(|e| e.message.clone())
            .unwrap_or_default();
        if detail.is_empty() {
            return api_error.message;
        }
        return format!("{}: {}", api_error.message, detail);
    }
    sanitize_error_body(body)
}

/// Sanitize an API error body to prevent credential leakage. Truncates long
/// responses and redacts potential secrets.
fn sanitize_error_body(body: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "token",
        "secret",
        "password",
        "credential",
        "bearer",
        "ghp_",
        "gho_",
        "ghu_",
        "github_pat_",
    ];

    let truncated = if body.len() > MAX_ERROR_BODY_LEN {
        format!("{}... (truncated)", &body[..MAX_ERROR_BODY_LEN])
    } else {
        body.to_string()
    };

    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(error details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            path: name.to_string(),
            kind,
            size: None,
        }
    }

    #[test]
    fn test_sort_entries_directories_before_files() {
        let mut entries = vec![
            entry("b.txt", EntryKind::File),
            entry("a", EntryKind::Dir),
            entry("z.txt", EntryKind::File),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b.txt", "z.txt"]);
    }

    #[test]
    fn test_sort_entries_lexicographic_within_kind() {
        let mut entries = vec![
            entry("src", EntryKind::Dir),
            entry("docs", EntryKind::Dir),
            entry("main.rs", EntryKind::File),
            entry("Cargo.toml", EntryKind::File),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "src", "Cargo.toml", "main.rs"]);
    }

    #[test]
    fn test_encode_decode_round_trips_multibyte() {
        let original = "test('café ☕', () => { expect('🚀').toBeTruthy(); });";
        let encoded = encode_content(original);
        let decoded = decode_file_content("a.test.js", "tests/a.test.js", 64, &encoded).unwrap();
        assert_eq!(decoded.content, original);
        assert!(!decoded.binary);
    }

    #[test]
    fn test_decode_handles_github_line_wrapping() {
        let encoded = encode_content("hello world, this payload gets wrapped");
        let wrapped: String = encoded
            .as_bytes()
            .chunks(10)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let decoded = decode_file_content("f.txt", "f.txt", 39, &wrapped).unwrap();
        assert_eq!(decoded.content, "hello world, this payload gets wrapped");
    }

    #[test]
    fn test_binary_content_gets_sentinel() {
        let bytes: Vec<u8> = vec![0x7f, 0x45, 0x4c, 0x46, 0x00, 0x00, 0x01];
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let decoded = decode_file_content("app.bin", "bin/app.bin", 7, &encoded).unwrap();
        assert!(decoded.binary);
        assert_eq!(decoded.content, "Binary file: app.bin (7 bytes)");
    }

    #[test]
    fn test_utf8_text_is_not_classified_binary() {
        let encoded = encode_content("fn main() { println!(\"héllo\"); }");
        let decoded = decode_file_content("main.rs", "src/main.rs", 33, &encoded).unwrap();
        assert!(!decoded.binary);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = decode_file_content("f.txt", "f.txt", 10, "!!!not-base64!!!");
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_api_error_message_prefers_structured_detail() {
        let body = r#"{"message": "Validation Failed", "errors": [{"message": "A pull request already exists"}]}"#;
        assert_eq!(
            api_error_message(body),
            "Validation Failed: A pull request already exists"
        );
    }

    #[test]
    fn test_api_error_message_without_details() {
        let body = r#"{"message": "Not Found"}"#;
        assert_eq!(api_error_message(body), "Not Found");
    }

    #[test]
    fn test_sanitize_error_body_redacts_secrets() {
        let body = "something went wrong with ghp_abcdef123456";
        assert!(sanitize_error_body(body).contains("redacted"));
    }

    #[test]
    fn test_sanitize_error_body_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_error_body(&body);
        assert!(sanitized.ends_with("(truncated)"));
        assert!(sanitized.len() < body.len());
    }

    #[test]
    fn test_repository_deserializes_github_shape() {
        let json = r#"{
            "id": 42,
            "name": "widgets",
            "description": null,
            "html_url": "https://github.com/octo/widgets",
            "language": "TypeScript",
            "owner": {"login": "octo"}
        }"#;
        let repo: Repository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.owner.unwrap().login, "octo");
        assert!(repo.description.is_none());
    }

    #[test]
    fn test_directory_entry_deserializes_type_field() {
        let json = r#"{"name": "src", "path": "src", "type": "dir"}"#;
        let e: DirectoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.kind, EntryKind::Dir);
        assert!(e.size.is_none());
    }

    #[test]
    fn test_create_ref_request_serializes_ref_keyword() {
        let req = CreateRefRequest {
            git_ref: "refs/heads/add-test-123".into(),
            sha: "abc123".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"ref\":\"refs/heads/add-test-123\""));
        assert!(json.contains("\"sha\":\"abc123\""));
    }
}
