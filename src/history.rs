//! Navigation history for the repository browser.
//!
//! A stack of directory paths visited within the selected repository. The
//! repo root (the empty path) is always the bottom element and can never be
//! popped.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    paths: Vec<String>,
}

impl NavigationHistory {
    /// A fresh history at the repo root.
    pub fn new() -> Self {
        Self {
            paths: vec![String::new()],
        }
    }

    /// The path currently on top of the stack.
    pub fn current(&self) -> &str {
        // Invariant: never empty, so last() always exists.
        self.paths.last().map(String::as_str).unwrap_or("")
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.paths.push(path.into());
    }

    /// Pop the top path and return the new current one. A no-op at the
    /// root.
    pub fn pop(&mut self) -> &str {
        if self.paths.len() > 1 {
            self.paths.pop();
        }
        self.current()
    }

    /// Whether the browser is at the repo root.
    pub fn at_root(&self) -> bool {
        self.paths.len() == 1
    }

    pub fn depth(&self) -> usize {
        self.paths.len()
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}
