// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository command arguments.
//!
//! ```text
//! PATH is always the working tree root; no upward discovery.
//! branch create PATH NAME | branch delete PATH NAME
//! commit PATH -m MSG [FILES...]   (no FILES: stage everything)
//! ```

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// A single repository.
#[derive(Debug, Clone, Args)]
pub struct RepoArgs {
    /// Working tree root of the repository.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Arguments for `status`.
#[derive(Debug, Clone, Default, Args)]
pub struct StatusArgs {
    /// Repositories to check; defaults to `paths.repos`.
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,
}

/// Arguments for `diff`.
#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// File relative to the repository root.
    #[arg(value_name = "FILE")]
    pub file: String,
}

/// Arguments for `checkout`.
#[derive(Debug, Clone, Args)]
pub struct CheckoutArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Local branch, or a branch on the remote to track.
    #[arg(value_name = "BRANCH")]
    pub branch: String,
}

/// Arguments for `branch`.
#[derive(Debug, Clone, Args)]
pub struct BranchArgs {
    #[command(subcommand)]
    pub action: BranchAction,
}

/// Branch subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum BranchAction {
    /// Creates a branch at HEAD without switching to it.
    Create {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Deletes a local branch; main and master are refused.
    Delete {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Arguments for `commit`.
#[derive(Debug, Clone, Args)]
pub struct CommitArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Commit message.
    #[arg(short = 'm', long = "message", required = true)]
    pub message: String,

    /// Files to stage first; everything when omitted.
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,
}

/// Arguments for `merge`.
#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Branch merged into the current one.
    #[arg(value_name = "SOURCE")]
    pub source: String,
}

/// Arguments for `stash`.
#[derive(Debug, Clone, Args)]
pub struct StashArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Stash message.
    #[arg(short = 'm', long = "message")]
    pub message: Option<String>,
}

/// Arguments for `ignore`.
#[derive(Debug, Clone, Args)]
pub struct IgnoreArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Lines to append.
    #[arg(value_name = "ENTRIES", required = true)]
    pub entries: Vec<String>,
}
