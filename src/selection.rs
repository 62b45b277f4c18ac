//! Multi-file selection for analysis.
//!
//! A small set of files keyed by path, decoupled from which file is
//! currently being viewed. Insertion order is preserved for UI stability.

use crate::github::FileContent;

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    files: Vec<FileContent>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add if absent, remove if present, by path equality.
    pub fn toggle(&mut self, file: FileContent) {
        if let Some(pos) = self.files.iter().position(|f| f.path == file.path) {
            self.files.remove(pos);
        } else {
            self.files.push(file);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[FileContent] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
