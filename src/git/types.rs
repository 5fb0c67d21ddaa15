// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Value types shared by both repository backends.

use serde::Serialize;

/// How a single path differs from HEAD or the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatusKind {
    Modified,
    Staged,
    Untracked,
    Deleted,
    Renamed,
    Conflicted,
}

impl FileStatusKind {
    /// Single-letter marker used by the CLI listing.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Staged => 'A',
            Self::Untracked => '?',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Conflicted => 'U',
        }
    }
}

/// One changed path in a working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub status: FileStatusKind,
    /// Whether the change lives in the index.
    pub staged: bool,
}

impl FileChange {
    #[must_use]
    pub fn new(path: impl Into<String>, status: FileStatusKind, staged: bool) -> Self {
        Self {
            path: path.into(),
            status,
            staged,
        }
    }
}

/// Staged and unstaged changes of a working copy.
///
/// Both lists are sorted case-insensitively by path, and a path present in
/// `staged` never appears in `unstaged`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub staged: Vec<FileChange>,
    pub unstaged: Vec<FileChange>,
}

impl ChangeSet {
    /// Build a change set from raw entries, enforcing the ordering and
    /// no-duplicate rules.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = FileChange>) -> Self {
        let mut set = Self::default();
        let mut unstaged = Vec::new();
        for entry in entries {
            if entry.staged {
                if !set.staged.iter().any(|c| c.path == entry.path) {
                    set.staged.push(entry);
                }
            } else {
                unstaged.push(entry);
            }
        }
        for entry in unstaged {
            let seen = set.staged.iter().any(|c| c.path == entry.path)
                || set.unstaged.iter().any(|c| c.path == entry.path);
            if !seen {
                set.unstaged.push(entry);
            }
        }
        set.staged.sort_by_key(|c| c.path.to_lowercase());
        set.unstaged.sort_by_key(|c| c.path.to_lowercase());
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}

/// Branch listing for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchList {
    /// Checked-out branch, `None` when HEAD is detached.
    pub current: Option<String>,
    pub local: Vec<String>,
    /// Remote branches (without the remote prefix) that have no local counterpart.
    pub remote: Vec<String>,
}

/// Result classification of a merge or pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Nothing to merge.
    UpToDate,
    /// The branch ref moved forward; no commit was created.
    FastForward,
    /// A merge commit with two parents was created.
    Merged,
}

impl MergeOutcome {
    /// Human-readable summary used as the task result message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UpToDate => "Already up to date",
            Self::FastForward => "Fast-forward merge successful",
            Self::Merged => "Merge successful",
        }
    }

    /// Whether the merge moved the current branch.
    #[must_use]
    pub const fn changed_head(self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

/// Which paths a commit stages first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageSelection {
    /// Everything, including untracked files and deletions.
    All,
    /// Only these repository-relative paths.
    Files(Vec<String>),
}

impl StageSelection {
    /// Empty file list means everything.
    #[must_use]
    pub fn from_files(files: &[String]) -> Self {
        if files.is_empty() {
            Self::All
        } else {
            Self::Files(files.to_vec())
        }
    }
}
