// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Path filtering for change listings and `.gitignore` maintenance.
//!
//! ```text
//! IgnoreSet (wax globs, repo-relative)  --> filters FileChange paths
//! append_entries(repo, entries)         --> .gitignore (append only)
//! ```

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use tracing::debug;
use wax::{Glob, Program as _};

use crate::error::{GitError, GitResult, Result};

/// Compiled set of globs hiding paths from change listings.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    globs: Vec<Glob<'static>>,
}

impl IgnoreSet {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns `GitError::Generic` naming the first pattern that does not
    /// compile.
    pub fn new<I, S>(patterns: I) -> GitResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let globs = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Glob::new(pattern)
                    .map(Glob::into_owned)
                    .map_err(|e| GitError::Generic(format!("bad ignore glob '{pattern}': {e}")))
            })
            .collect::<GitResult<Vec<_>>>()?;
        Ok(Self { globs })
    }

    /// Whether a repository-relative, `/`-separated path is hidden.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        self.globs.iter().any(|glob| glob.is_match(path))
    }
}

/// Append entries to `<repo>/.gitignore`, one per line.
///
/// The file is created when missing and never truncated. Existing content
/// that does not end with a newline gets one first, and entries already
/// present (exact line match) are skipped. Returns the entries written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn append_entries<S: AsRef<str>>(repo: &Path, entries: &[S]) -> Result<Vec<String>> {
    let path = repo.join(".gitignore");
    let existing = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let mut known: Vec<&str> = existing.lines().map(str::trim_end).collect();
    let mut added = Vec::new();
    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() || known.contains(&entry) {
            continue;
        }
        known.push(entry);
        added.push(entry.to_string());
    }

    if added.is_empty() {
        return Ok(added);
    }

    let mut text = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        text.push('\n');
    }
    for entry in &added {
        text.push_str(entry);
        text.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;

    debug!(file = %path.display(), count = added.len(), "gitignore updated");
    Ok(added)
}
