// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync and dirty summary of a working copy.
//!
//! ```text
//! path --open--> handle --+-- current_branch()        (None if detached)
//!   |                     +-- ahead_behind()          -> needs_push / needs_pull
//!   |                     '-- has_uncommitted_changes -> needs_commit
//!   '-- open/query error --> RepoStatus::failed(message)
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::backend::{RepositoryBackend, RepositoryHandle};
use crate::error::{GitError, GitResult};

/// Derived state of one repository. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub current_branch: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub needs_commit: bool,
    pub needs_push: bool,
    pub needs_pull: bool,
    pub has_error: bool,
    pub error_message: String,
}

impl RepoStatus {
    /// Status for a repository that could not be inspected.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            has_error: true,
            error_message: message.into(),
            ..Self::default()
        }
    }

    /// Whether nothing needs attention.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.has_error && !self.needs_commit && !self.needs_push && !self.needs_pull
    }
}

/// Status of one path in a batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStatusEntry {
    pub path: PathBuf,
    pub status: RepoStatus,
}

/// Compute the status of an open repository.
///
/// # Errors
///
/// Propagates backend failures other than a detached HEAD, which only
/// leaves `current_branch` empty.
pub fn compute(handle: &dyn RepositoryHandle) -> GitResult<RepoStatus> {
    let current_branch = match handle.current_branch() {
        Ok(branch) => Some(branch),
        Err(GitError::DetachedHead) => None,
        Err(e) => return Err(e),
    };
    let (ahead, behind) = handle.ahead_behind()?;
    let needs_commit = handle.has_uncommitted_changes()?;

    Ok(RepoStatus {
        current_branch,
        ahead,
        behind,
        needs_commit,
        needs_push: ahead > 0,
        needs_pull: behind > 0,
        has_error: false,
        error_message: String::new(),
    })
}

/// Open `path` and compute its status; errors land in the status itself.
#[must_use]
pub fn check(backend: &dyn RepositoryBackend, path: &Path) -> RepoStatus {
    let result = backend.open(path).and_then(|handle| compute(handle.as_ref()));
    match result {
        Ok(status) => {
            debug!(
                repo = %path.display(),
                branch = ?status.current_branch,
                ahead = status.ahead,
                behind = status.behind,
                dirty = status.needs_commit,
                "status computed"
            );
            status
        }
        Err(e) => {
            warn!(repo = %path.display(), error = %e, "status check failed");
            RepoStatus::failed(e.to_string())
        }
    }
}

/// Status of every path, sequentially and in input order.
///
/// `on_progress(done, total)` runs after each path.
pub fn check_all(
    backend: &dyn RepositoryBackend,
    paths: &[PathBuf],
    mut on_progress: impl FnMut(usize, usize),
) -> Vec<RepoStatusEntry> {
    let total = paths.len();
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let status = check(backend, path);
            on_progress(index + 1, total);
            RepoStatusEntry {
                path: path.clone(),
                status,
            }
        })
        .collect()
}
