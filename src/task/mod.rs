// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Serialized git task execution.
//!
//! ```text
//! caller                         worker thread (one per queue)
//!   submit(kind, path, args)
//!     --> TaskRequest --> FIFO --> Dispatcher::handle
//!                                   |   progress --> QueueEvent::Progress
//!                                   v
//!   <-- QueueEvent::Completed(TaskResult)   (flume channel)
//! ```
//!
//! Exactly one result is delivered per accepted request. Requests are
//! executed one at a time, in submission order, across all repositories.

pub mod dispatch;
pub mod queue;


use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::git::stash_guard::CheckoutReport;
use crate::git::status::{RepoStatus, RepoStatusEntry};
use crate::git::types::{BranchList, ChangeSet, MergeOutcome};

pub use dispatch::Dispatcher;
pub use queue::{TaskHandler, TaskQueue};

/// Per-queue request identifier, increasing from 1.
pub type RequestId = u64;

/// Operation requested from the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskKind {
    CheckStatus,
    /// `args` holds the repository paths; `repo_path` is unused.
    CheckAllStatus,
    Fetch,
    Pull,
    Push,
    /// `args[0]` is the message, remaining args the files to stage (all when none).
    Commit,
    /// `args[0]` is the branch.
    Checkout,
    CreateBranch,
    DeleteBranch,
    /// `args[0]` is the source branch.
    Merge,
    Reset,
    Restore,
    /// `args[0]`, if present, is the stash message.
    Stash,
    StashPop,
    GetBranches,
    GetChanges,
    /// `args[0]` is the repository-relative file.
    GetDiff,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One unit of work. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub request_id: RequestId,
    pub kind: TaskKind,
    pub repo_path: PathBuf,
    pub args: Vec<String>,
}

impl TaskRequest {
    #[must_use]
    pub fn new(
        request_id: RequestId,
        kind: TaskKind,
        repo_path: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Self {
        Self {
            request_id,
            kind,
            repo_path: repo_path.into(),
            args,
        }
    }

    /// Argument at `index`, ignoring empty strings.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }
}

/// Kind-specific result data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskPayload {
    Status(RepoStatus),
    StatusBatch(Vec<RepoStatusEntry>),
    Branches(BranchList),
    Changes(ChangeSet),
    Diff(String),
    /// Whether a stash entry was created.
    Bool(bool),
    Checkout(Option<CheckoutReport>),
    Merge(Option<MergeOutcome>),
    None,
}

impl TaskPayload {
    /// The payload a failed result of `kind` carries.
    #[must_use]
    pub fn empty(kind: TaskKind) -> Self {
        match kind {
            TaskKind::CheckStatus => Self::Status(RepoStatus::default()),
            TaskKind::CheckAllStatus => Self::StatusBatch(Vec::new()),
            TaskKind::GetBranches => Self::Branches(BranchList::default()),
            TaskKind::GetChanges => Self::Changes(ChangeSet::default()),
            TaskKind::GetDiff => Self::Diff(String::new()),
            TaskKind::Stash => Self::Bool(false),
            TaskKind::Checkout => Self::Checkout(None),
            TaskKind::Merge | TaskKind::Pull => Self::Merge(None),
            TaskKind::Fetch
            | TaskKind::Push
            | TaskKind::Commit
            | TaskKind::CreateBranch
            | TaskKind::DeleteBranch
            | TaskKind::Reset
            | TaskKind::Restore
            | TaskKind::StashPop => Self::None,
        }
    }
}

/// Outcome of one request; `request_id` and `kind` echo the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    pub request_id: RequestId,
    pub kind: TaskKind,
    pub success: bool,
    pub message: String,
    pub payload: TaskPayload,
}

impl TaskResult {
    #[must_use]
    pub fn ok(request: &TaskRequest, message: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            request_id: request.request_id,
            kind: request.kind,
            success: true,
            message: message.into(),
            payload,
        }
    }

    /// Failed result with the kind's empty payload.
    #[must_use]
    pub fn failed(request: &TaskRequest, message: impl Into<String>) -> Self {
        Self {
            request_id: request.request_id,
            kind: request.kind,
            success: false,
            message: message.into(),
            payload: TaskPayload::empty(request.kind),
        }
    }
}

/// Progress of a long-running request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub request_id: RequestId,
    /// 0 to 100.
    pub percent: u8,
    pub label: String,
}

/// Unit of delivery from the worker to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Progress(ProgressEvent),
    Completed(TaskResult),
}
