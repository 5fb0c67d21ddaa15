// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository backend abstraction layer.
//!
//! ```text
//!   RepositoryBackend::open(path)
//!        |                  |
//!        v                  v
//!  NativeBackend       ShellBackend
//!  (git2 / libgit2)    (git subprocess, tokio runtime)
//!        |                  |
//!        v                  v
//!  NativeRepository    ShellRepository
//!        \                  /
//!         '-> dyn RepositoryHandle <-'
//!             (one contract, same errors)
//! ```
//!
//! Callers hold a `Box<dyn RepositoryBackend>` and never branch on which
//! implementation is active. Handles live for one task: they are opened,
//! used and dropped on the worker thread.

pub mod credentials;
pub mod native;
pub mod shell;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::time::Duration;

use bon::Builder;

use crate::config::types::{BackendKind, DEFAULT_COMMAND_TIMEOUT, GitConfig};
use crate::error::{GitError, GitResult};
use crate::git::diff::BinaryDenylist;
use crate::git::ignore::IgnoreSet;
use crate::git::types::{ChangeSet, MergeOutcome, StageSelection};

pub use native::NativeBackend;
pub use shell::ShellBackend;

/// Branches that can never be deleted.
pub const PROTECTED_BRANCHES: &[&str] = &["main", "master"];

/// Settings shared by both backends.
#[derive(Debug, Clone, Builder)]
pub struct BackendOptions {
    /// Remote used by fetch, pull, push and tracking checkout.
    #[builder(into, default = "origin".to_string())]
    remote: String,
    #[builder(default)]
    ignore: IgnoreSet,
    #[builder(default)]
    binary: BinaryDenylist,
    /// Hard limit for one git subprocess (CLI backend only).
    #[builder(default = Duration::from_secs(DEFAULT_COMMAND_TIMEOUT))]
    command_timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BackendOptions {
    /// Build options from the `[git]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `GitError::Generic` if an ignore glob does not compile.
    pub fn from_config(config: &GitConfig) -> GitResult<Self> {
        Ok(Self::builder()
            .remote(config.remote.clone())
            .ignore(IgnoreSet::new(&config.ignore)?)
            .binary(BinaryDenylist::new(&config.binary_extensions))
            .command_timeout(Duration::from_secs(config.command_timeout))
            .build())
    }

    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    #[must_use]
    pub const fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    #[must_use]
    pub const fn binary(&self) -> &BinaryDenylist {
        &self.binary
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        self.command_timeout
    }
}

/// Factory for per-task repository handles.
pub trait RepositoryBackend: Send {
    /// Which implementation this is (for logging only).
    fn kind(&self) -> BackendKind;

    /// Shared settings.
    fn options(&self) -> &BackendOptions;

    /// Open the repository whose working tree root is `path`.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepositoryInvalid` when `path` holds no repository
    /// metadata.
    fn open<'a>(&'a self, path: &Path) -> GitResult<Box<dyn RepositoryHandle + 'a>>;
}

/// Uniform operations against one open repository.
///
/// # Errors
///
/// Every method reports failures as a [`GitError`] whose `Display` text is
/// suitable for a task result message.
pub trait RepositoryHandle {
    /// Working tree root this handle was opened on.
    fn path(&self) -> &Path;

    /// Short name of the checked-out branch; `DetachedHead` otherwise.
    fn current_branch(&self) -> GitResult<String>;

    /// Local branch names, sorted case-insensitively.
    fn list_local_branches(&self) -> GitResult<Vec<String>>;

    /// Remote branch names (see [`remote_display_names`]).
    fn list_remote_branches(&self) -> GitResult<Vec<String>>;

    /// Commits ahead of and behind the upstream; `(0, 0)` without one.
    fn ahead_behind(&self) -> GitResult<(usize, usize)>;

    /// Index differs from HEAD, or tracked files are modified or deleted, or
    /// untracked files exist.
    fn has_uncommitted_changes(&self) -> GitResult<bool>;

    /// Staged and unstaged changes, ignore globs applied.
    fn changes(&self) -> GitResult<ChangeSet>;

    fn stage(&self, selection: &StageSelection) -> GitResult<()>;

    /// Commit the index on top of HEAD (no parent on an unborn branch).
    fn commit(&self, message: &str) -> GitResult<()>;

    /// Switch to a local branch, creating it from `<remote>/<branch>` with
    /// tracking when only the remote one exists.
    fn checkout(&self, branch: &str) -> GitResult<()>;

    /// Create a branch at HEAD without switching to it.
    fn create_branch(&self, name: &str) -> GitResult<()>;

    /// Delete a local branch that is not checked out.
    fn delete_branch(&self, name: &str) -> GitResult<()>;

    /// Merge a local branch into the current one.
    fn merge(&self, source: &str) -> GitResult<MergeOutcome>;

    fn fetch(&self) -> GitResult<()>;

    /// Push the current branch to the same name on the remote.
    fn push(&self) -> GitResult<()>;

    /// Fetch, then merge the upstream of the current branch.
    fn pull(&self) -> GitResult<MergeOutcome>;

    /// Stash tracked changes; `false` when there was nothing to stash.
    fn stash(&mut self, message: Option<&str>) -> GitResult<bool>;

    /// Apply and drop the newest stash entry.
    fn stash_pop(&mut self) -> GitResult<()>;

    /// Reset the index to HEAD, keeping the working tree.
    fn reset(&self) -> GitResult<()>;

    /// Force the working tree of tracked files back to HEAD.
    fn restore(&self) -> GitResult<()>;

    /// Unified diff (index to working tree) for one repository-relative path.
    fn diff_file(&self, file: &str) -> GitResult<String>;
}

/// Create the backend selected by configuration.
///
/// # Errors
///
/// Returns an error if the options cannot be built or, for the CLI backend,
/// `git` is not on PATH or its runtime cannot start.
pub fn create_backend(config: &GitConfig) -> GitResult<Box<dyn RepositoryBackend>> {
    let options = BackendOptions::from_config(config)?;
    Ok(match config.backend {
        BackendKind::Native => Box::new(NativeBackend::new(options)),
        BackendKind::Cli => Box::new(ShellBackend::new(options)?),
    })
}

// --- Shared rules ---

/// Reject branch names the handlers never pass to a backend.
///
/// # Errors
///
/// Returns `GitError::InvalidBranchName` for empty names or names containing
/// whitespace.
pub fn validate_branch_name(name: &str) -> GitResult<()> {
    if name.is_empty() {
        return Err(GitError::InvalidBranchName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(GitError::InvalidBranchName {
            name: name.to_string(),
            reason: "branch name cannot contain spaces",
        });
    }
    Ok(())
}

/// Whether `name` is one of [`PROTECTED_BRANCHES`].
#[must_use]
pub fn is_protected(name: &str) -> bool {
    PROTECTED_BRANCHES.contains(&name)
}

/// # Errors
///
/// Returns `GitError::ProtectedBranch` for `main` and `master`.
pub fn ensure_deletable(name: &str) -> GitResult<()> {
    if is_protected(name) {
        return Err(GitError::ProtectedBranch {
            branch: name.to_string(),
        });
    }
    Ok(())
}

/// Sort branch names case-insensitively, in place.
pub fn sort_branches(names: &mut [String]) {
    names.sort_by_cached_key(|name| name.to_lowercase());
}

/// Turn remote-tracking short names (`origin/feature`) into display names.
///
/// Strips the `<remote>/` prefix, drops `HEAD` pointers and names that
/// exist locally, dedups and sorts case-insensitively.
#[must_use]
pub fn remote_display_names<I, S>(remote: &str, tracking: I, local: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = format!("{remote}/");
    let mut names: Vec<String> = tracking
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let short = name.strip_prefix(&prefix).unwrap_or(name);
            let is_head = short == "HEAD" || short.ends_with("/HEAD");
            (!is_head && !local.iter().any(|l| l == short)).then(|| short.to_string())
        })
        .collect();
    sort_branches(&mut names);
    names.dedup();
    names
}
