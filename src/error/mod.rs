// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!           SardineError (~24 bytes)
//!                  |
//!   +------+-------+-------+-------+------+
//!   |      |       |       |       |      |
//!   v      v       v       v       v      v
//!  Git  Process  Config  Queue    Io    Other
//!  Box    Box     Box     Box     Box  Box<str>
//!
//! Sub-errors (unboxed internally):
//!   Git      RepositoryInvalid, DetachedHead, BranchNotFound,
//!            ProtectedBranch, NoIdentity, MergeConflict,
//!            StashConflict, DirtyWorkingTree, AuthenticationFailed,
//!            CommandTimeout, BinaryFileDiff, Generic, Gix
//!   Process  ExecutableNotFound, SpawnFailed, NonZeroExit, Timeout
//!   Config   ParseError, InvalidValue
//!   Queue    ShutDown, WorkerSpawn
//!
//! All variants boxed => SardineError fits in 24 bytes.
//! ```
//!
//! Backends return [`GitError`] directly: its `Display` text is what ends up
//! in a failed task result's message.

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`SardineError`].
pub type SardineResult<T> = std::result::Result<T, SardineError>;

/// Result type for repository operations.
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Top-level application error type.
///
/// All sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum SardineError {
    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] Box<GitError>),

    /// Process execution error.
    #[error("process error: {0}")]
    Process(#[from] Box<ProcessError>),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] Box<ConfigError>),

    /// Task queue error.
    #[error("queue error: {0}")]
    Queue(#[from] Box<QueueError>),

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for SardineError {
                fn from(err: $error) -> Self {
                    SardineError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    GitError => Git,
    ProcessError => Process,
    ConfigError => Config,
    QueueError => Queue,
    std::io::Error => Io,
}

// --- Gix Errors ---

/// Wrapper for gix-specific errors raised by read-only HEAD queries.
#[derive(Debug, Error)]
pub enum GixError {
    /// Failed to open repository.
    #[error("failed to open repository: {0}")]
    Open(#[from] Box<gix::open::Error>),

    /// Failed to get HEAD reference.
    #[error("failed to get head reference: {0}")]
    Head(#[from] gix::reference::find::existing::Error),
}

// --- Git Errors ---

/// Repository operation errors.
///
/// Every failure a handler can report maps onto one of these variants.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository metadata found at the path.
    #[error("not a git repository: {path}")]
    RepositoryInvalid { path: String },

    /// HEAD does not point at a branch.
    #[error("detached HEAD - checkout a branch")]
    DetachedHead,

    /// Branch exists neither locally nor on `origin`.
    #[error("branch '{branch}' not found")]
    BranchNotFound { branch: String },

    /// `main` and `master` can never be deleted.
    #[error("cannot delete protected branch '{branch}'")]
    ProtectedBranch { branch: String },

    /// Author identity could not be resolved.
    #[error("cannot create signature - configure user.name and user.email")]
    NoIdentity,

    /// Merge stopped on index conflicts; nothing was committed.
    #[error("merging '{source_branch}' produced conflicts - resolve manually")]
    MergeConflict { source_branch: String },

    /// Re-applying a stash produced conflicts; the stash entry is kept.
    #[error("stash restore produced conflicts - the stash entry was kept")]
    StashConflict,

    /// Operation requires a clean working tree.
    #[error("commit or discard changes before {operation}")]
    DirtyWorkingTree { operation: &'static str },

    /// Credentials were rejected or exhausted.
    #[error("authentication failed for '{remote}': {message}")]
    AuthenticationFailed { remote: String, message: String },

    /// A git subprocess exceeded its hard timeout.
    #[error("git {command} timed out after {timeout_secs} seconds")]
    CommandTimeout { command: String, timeout_secs: u64 },

    /// Diff refused for a denylisted binary extension.
    #[error("binary file - diff not available: {path}")]
    BinaryFileDiff { path: String },

    /// Branch name rejected before touching the repository.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: &'static str },

    /// A task argument was missing.
    #[error("{what} required")]
    MissingArgument { what: &'static str },

    /// Current branch has no upstream to pull from.
    #[error("no upstream branch configured for '{branch}'")]
    NoUpstream { branch: String },

    /// Remote not found.
    #[error("remote not found: {remote}")]
    RemoteNotFound { remote: String },

    /// Error from a read-only gix query.
    #[error("gix error: {0}")]
    Gix(#[from] GixError),

    /// Any other backend failure, carrying the backend's own message.
    #[error("{0}")]
    Generic(String),
}

/// Maps libgit2 failures that carry their meaning in code and class alone.
///
/// Authentication and missing-repository errors need the remote or path, so
/// the backend maps those where it has them.
impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let conflict = matches!(err.code(), ErrorCode::Conflict | ErrorCode::MergeConflict);
        match err.class() {
            ErrorClass::Stash if conflict => Self::StashConflict,
            ErrorClass::Checkout if conflict => Self::DirtyWorkingTree {
                operation: "checkout",
            },
            _ => Self::Generic(err.message().to_string()),
        }
    }
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration source.
    #[error("failed to parse config '{path}': {message}")]
    ParseError { path: String, message: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

// --- Process Errors ---

/// Process execution errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Executable not found in PATH.
    #[error("executable not found: '{name}' (not in PATH)")]
    ExecutableNotFound { name: String },

    /// Failed to spawn process.
    #[error("failed to spawn process '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited with non-zero status.
    #[error("process '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    /// Process timed out.
    #[error("process '{command}' timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },
}

// --- Queue Errors ---

/// Task queue errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue no longer accepts requests.
    #[error("task queue is shut down")]
    ShutDown,

    /// The worker thread could not be started.
    #[error("failed to spawn git worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
