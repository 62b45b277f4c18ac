//! Repository browser state machine
//!
//! Owns the repo listing, the selected repository, the current directory
//! listing, the viewed file, and the navigation history. Fetches are split
//! into a `begin_*` half (issues a ticket, marks loading) and a
//! `complete_*` half (applies the gateway result), so the shell can drive
//! them as separate futures. Every ticket carries a monotonically
//! increasing id; a completion whose id is no longer the latest issued is
//! discarded, which keeps a slow response from overwriting newer state.

use crate::github::{DirectoryEntry, FileContent, Repository};
use crate::history::NavigationHistory;
use tracing::debug;

/// Where the browser currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BrowserPhase {
    #[default]
    NoRepoSelected,
    ListingDirectory,
    ViewingFile,
    /// A fetch failed. Directory contents from before the failure are left
    /// in place rather than cleared.
    Error {
        message: String,
    },
}

/// Handle for an in-flight fetch. Only the most recently issued ticket is
/// allowed to apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    id: u64,
    path: String,
}

impl FetchTicket {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Default)]
pub struct BrowserState {
    repos: Vec<Repository>,
    selected_repo: Option<String>,
    current_path: String,
    entries: Vec<DirectoryEntry>,
    file: Option<FileContent>,
    history: NavigationHistory,
    phase: BrowserPhase,
    loading: bool,
    fetch_seq: u64,
}

impl BrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Read accessors for the shell
    // ------------------------------------------------------------------

    pub fn phase(&self) -> &BrowserPhase {
        &self.phase
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repos
    }

    pub fn selected_repo(&self) -> Option<&str> {
        self.selected_repo.as_deref()
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn viewed_file(&self) -> Option<&FileContent> {
        self.file.as_ref()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    /// The recorded owner login of the selected repository, when the
    /// listing carried one.
    pub fn owner_login(&self) -> Option<&str> {
        let name = self.selected_repo.as_deref()?;
        self.repos
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.owner.as_ref())
            .map(|o| o.login.as_str())
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Replace the repository listing wholesale.
    pub fn set_repositories(&mut self, repos: Vec<Repository>) {
        self.repos = repos;
    }

    /// Select a repository: navigation resets to the root and the viewed
    /// file is dropped. Returns the ticket for the root listing fetch.
    pub fn begin_select_repository(&mut self, name: impl Into<String>) -> FetchTicket {
        let name = name.into();
        debug!(repo = %name, "selecting repository");
        self.selected_repo = Some(name);
        self.current_path.clear();
        self.entries.clear();
        self.file = None;
        self.history = NavigationHistory::new();
        self.phase = BrowserPhase::ListingDirectory;
        self.issue_ticket(String::new())
    }

    /// Descend into a directory. The path goes onto the history stack now;
    /// the listing itself lands in `complete_listing`.
    pub fn begin_open_directory(&mut self, path: impl Into<String>) -> FetchTicket {
        let path = path.into();
        self.history.push(path.clone());
        self.issue_ticket(path)
    }

    /// Open a file for viewing. History is untouched.
    pub fn begin_open_file(&mut self, path: impl Into<String>) -> FetchTicket {
        self.issue_ticket(path.into())
    }

    /// Step back up the history stack. `None` at the root: there is nothing
    /// to go back to and no fetch is issued.
    pub fn begin_go_back(&mut self) -> Option<FetchTicket> {
        if self.history.at_root() {
            return None;
        }
        let path = self.history.pop().to_string();
        Some(self.issue_ticket(path))
    }

    /// Apply a directory listing result. Stale tickets are discarded;
    /// returns whether the result was applied.
    pub fn complete_listing(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<DirectoryEntry>, crate::error::Error>,
    ) -> bool {
        if !self.is_current(&ticket) {
            debug!(path = %ticket.path, "discarding stale listing response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(entries) => {
                self.entries = entries;
                self.current_path = ticket.path;
                self.phase = BrowserPhase::ListingDirectory;
            }
            Err(err) => {
                self.phase = BrowserPhase::Error {
                    message: err.to_string(),
                };
            }
        }
        true
    }

    /// Apply a file read result. Stale tickets are discarded.
    pub fn complete_file(
        &mut self,
        ticket: FetchTicket,
        result: Result<FileContent, crate::error::Error>,
    ) -> bool {
        if !self.is_current(&ticket) {
            debug!(path = %ticket.path, "discarding stale file response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(file) => {
                self.file = Some(file);
                self.phase = BrowserPhase::ViewingFile;
            }
            Err(err) => {
                self.phase = BrowserPhase::Error {
                    message: err.to_string(),
                };
            }
        }
        true
    }

    /// Drop the viewed file (e.g. when the shell closes the viewer).
    pub fn clear_viewed_file(&mut self) {
        self.file = None;
        if self.phase == BrowserPhase::ViewingFile {
            self.phase = BrowserPhase::ListingDirectory;
        }
    }

    fn issue_ticket(&mut self, path: String) -> FetchTicket {
        self.fetch_seq += 1;
        self.loading = true;
        FetchTicket {
            id: self.fetch_seq,
            path,
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.id == self.fetch_seq
    }
}
