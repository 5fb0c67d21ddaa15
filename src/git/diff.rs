// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Binary-file exclusion and unified-diff assembly.
//!
//! ```text
//! diff request(path)
//!      |
//!      v
//! BinaryDenylist::check ---- denylisted ext ---> BinaryFileDiff
//!      |                     (no repository access)
//!      v
//! backend diff (index -> workdir, pathspec = path)
//!      |
//!      v
//! DiffFormatter: origin-prefixed lines --> patch text
//! ```

use crate::error::{GitError, GitResult};

/// Case-insensitive list of file extensions that are never diffed.
#[derive(Debug, Clone, Default)]
pub struct BinaryDenylist {
    /// Lowercased, each with its leading dot.
    extensions: Vec<String>,
}

impl BinaryDenylist {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Whether `path` ends in a denylisted extension.
    #[must_use]
    pub fn is_binary(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    /// # Errors
    ///
    /// Returns `GitError::BinaryFileDiff` when `path` is denylisted.
    pub fn check(&self, path: &str) -> GitResult<()> {
        if self.is_binary(path) {
            return Err(GitError::BinaryFileDiff {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

/// Accumulates diff lines into unified-patch text.
///
/// Content lines (`+`, `-`, context) get their origin character prepended;
/// file headers, hunk headers and end-of-file markers arrive preformatted.
#[derive(Debug, Default)]
pub struct DiffFormatter {
    buf: Vec<u8>,
}

impl DiffFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line as reported by libgit2's patch printer.
    pub fn push_line(&mut self, origin: char, content: &[u8]) {
        if matches!(origin, '+' | '-' | ' ') {
            let mut tmp = [0u8; 4];
            self.buf
                .extend_from_slice(origin.encode_utf8(&mut tmp).as_bytes());
        }
        self.buf.extend_from_slice(content);
    }

    /// Append already formatted patch text.
    pub fn push_text(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        if !text.is_empty() && !text.ends_with('\n') {
            self.buf.push(b'\n');
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn finish(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
