// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only HEAD lookups using gix.
//!
//! ```text
//! query.rs --> gix::open(path) --> .git/ (no subprocess, no queue)
//! ```
//!
//! Cheap enough to call from the caller's thread for display purposes while
//! the worker is busy. Nothing here writes to the repository.

use std::path::Path;

use serde::Serialize;

use crate::error::{GitError, GitResult, GixError};

/// What HEAD points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadInfo {
    /// Branch name, `None` when detached.
    pub branch: Option<String>,
    /// Full hex id of the HEAD commit, `None` on an unborn branch.
    pub commit: Option<String>,
    /// Whether `refs/stash` exists.
    pub has_stash: bool,
}

fn open(path: &Path) -> GitResult<gix::Repository> {
    gix::open(path).map_err(|e| match e {
        gix::open::Error::NotARepository { .. } => GitError::RepositoryInvalid {
            path: path.display().to_string(),
        },
        e => GitError::Gix(GixError::Open(Box::new(e))),
    })
}

/// Whether `path` itself is the root of a repository (no upward discovery).
#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    gix::open(path).is_ok()
}

/// Current branch name (None if HEAD is detached).
///
/// # Errors
///
/// Returns `GitError::RepositoryInvalid` if `path` is not a repository, or a
/// `GitError::Gix` if HEAD cannot be read.
pub fn current_branch(path: &Path) -> GitResult<Option<String>> {
    let repo = open(path)?;
    let head = repo.head_name().map_err(GixError::Head)?;
    Ok(head.map(|name| name.shorten().to_string()))
}

/// Branch, commit and stash presence in one repository open.
///
/// # Errors
///
/// Same as [`current_branch`].
pub fn head_info(path: &Path) -> GitResult<HeadInfo> {
    let repo = open(path)?;
    let head = repo.head().map_err(GixError::Head)?;

    let branch = head
        .referent_name()
        .map(|name| name.shorten().to_string());
    let commit = head.id().map(|id| id.to_string());

    let has_stash = match repo.find_reference("refs/stash") {
        Ok(_) => true,
        Err(gix::reference::find::existing::Error::NotFound { .. }) => false,
        Err(e) => return Err(GixError::Head(e).into()),
    };

    Ok(HeadInfo {
        branch,
        commit,
        has_stash,
    })
}
