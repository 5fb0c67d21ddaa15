// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Routing of task requests to repository operations.
//!
//! ```text
//! TaskRequest
//!   |
//!   +-- CheckAllStatus --> status::check_all (progress per path)
//!   +-- GetDiff ---------> denylist check (no repository access) --,
//!   |                                                               v
//!   '-- everything else -> backend.open(repo_path) --> handler(kind, handle)
//!                              |                           |
//!                              '-- error --> failed ------> TaskResult
//! ```

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use tracing::{info, warn};

use super::queue::{ProgressSink, TaskHandler};
use super::{TaskKind, TaskPayload, TaskRequest, TaskResult};
use crate::error::{GitError, GitResult};
use crate::git::backend::{self, RepositoryBackend, RepositoryHandle};
use crate::git::stash_guard;
use crate::git::status::{self, RepoStatus};
use crate::git::types::{BranchList, StageSelection};

/// Branches tried, in order, when the checked-out branch is deleted.
const FALLBACK_BRANCHES: [&str; 2] = ["master", "main"];

type Handled = GitResult<(String, TaskPayload)>;

/// Executes requests against the configured backend.
pub struct Dispatcher {
    backend: Box<dyn RepositoryBackend>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(backend: Box<dyn RepositoryBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &dyn RepositoryBackend {
        self.backend.as_ref()
    }

    /// Run one request to completion.
    #[must_use]
    pub fn dispatch(&self, request: &TaskRequest, progress: &ProgressSink) -> TaskResult {
        match request.kind {
            TaskKind::CheckAllStatus => self.check_all_status(request, progress),
            _ => match self.run(request) {
                Ok((message, payload)) => TaskResult::ok(request, message, payload),
                Err(e) => {
                    let mut result = TaskResult::failed(request, e.to_string());
                    if request.kind == TaskKind::CheckStatus {
                        result.payload = TaskPayload::Status(RepoStatus::failed(e.to_string()));
                    }
                    result
                }
            },
        }
    }

    fn run(&self, request: &TaskRequest) -> Handled {
        // Refused without touching the repository
        if request.kind == TaskKind::GetDiff {
            let file = required(request, 0, "File path")?;
            self.backend.options().binary().check(file)?;
        }

        let mut handle = self.backend.open(&request.repo_path)?;
        let repo = handle.as_mut();

        match request.kind {
            TaskKind::Fetch => {
                repo.fetch()?;
                Ok(("Fetch successful".to_string(), TaskPayload::None))
            }
            TaskKind::Push => {
                repo.push()?;
                Ok(("Push successful".to_string(), TaskPayload::None))
            }
            TaskKind::Pull => {
                let outcome = repo.pull()?;
                Ok((outcome.message().to_string(), TaskPayload::Merge(Some(outcome))))
            }
            TaskKind::Commit => commit(repo, request),
            TaskKind::Checkout => {
                let branch = required(request, 0, "Branch name")?;
                let report = stash_guard::checkout(repo, branch)?;
                Ok((report.message(), TaskPayload::Checkout(Some(report))))
            }
            TaskKind::CreateBranch => {
                let name = required(request, 0, "Branch name")?;
                repo.create_branch(name)?;
                Ok(("Branch created".to_string(), TaskPayload::None))
            }
            TaskKind::DeleteBranch => delete_branch(repo, request),
            TaskKind::Merge => merge(repo, request),
            TaskKind::Reset => {
                repo.reset()?;
                Ok(("Reset successful".to_string(), TaskPayload::None))
            }
            TaskKind::Restore => {
                repo.restore()?;
                Ok(("Restore successful".to_string(), TaskPayload::None))
            }
            TaskKind::Stash => {
                let created = repo.stash(request.arg(0))?;
                let message = if created {
                    "Stash created"
                } else {
                    "Nothing to stash"
                };
                Ok((message.to_string(), TaskPayload::Bool(created)))
            }
            TaskKind::StashPop => {
                repo.stash_pop()?;
                Ok(("Stash applied".to_string(), TaskPayload::None))
            }
            TaskKind::GetBranches => {
                let current = match repo.current_branch() {
                    Ok(branch) => Some(branch),
                    Err(GitError::DetachedHead) => None,
                    Err(e) => return Err(e),
                };
                let branches = BranchList {
                    current,
                    local: repo.list_local_branches()?,
                    remote: repo.list_remote_branches()?,
                };
                Ok((String::new(), TaskPayload::Branches(branches)))
            }
            TaskKind::GetChanges => Ok((String::new(), TaskPayload::Changes(repo.changes()?))),
            TaskKind::GetDiff => {
                let file = required(request, 0, "File path")?;
                Ok((String::new(), TaskPayload::Diff(repo.diff_file(file)?)))
            }
            TaskKind::CheckStatus => {
                let status = status::compute(repo)?;
                Ok((String::new(), TaskPayload::Status(status)))
            }
            TaskKind::CheckAllStatus => Err(GitError::Generic(
                "batch status is not a single-repository task".to_string(),
            )),
        }
    }

    fn check_all_status(&self, request: &TaskRequest, progress: &ProgressSink) -> TaskResult {
        let paths: Vec<PathBuf> = request.args.iter().map(PathBuf::from).collect();
        let entries = status::check_all(self.backend(), &paths, |done, total| {
            let percent = u8::try_from(done * 100 / total).unwrap_or(100);
            progress.report(percent, format!("Checking {done}/{total}"));
        });
        let failed = entries.iter().filter(|e| e.status.has_error).count();
        info!(
            request_id = request.request_id,
            total = entries.len(),
            failed,
            "batch status complete"
        );
        TaskResult::ok(request, "", TaskPayload::StatusBatch(entries))
    }
}

impl TaskHandler for Dispatcher {
    fn handle(&self, request: &TaskRequest, progress: &ProgressSink) -> TaskResult {
        self.dispatch(request, progress)
    }
}

fn required<'r>(request: &'r TaskRequest, index: usize, what: &'static str) -> GitResult<&'r str> {
    request
        .arg(index)
        .ok_or(GitError::MissingArgument { what })
}

fn commit(repo: &mut dyn RepositoryHandle, request: &TaskRequest) -> Handled {
    let message = required(request, 0, "Commit message")?;
    let files = request.args.get(1..).unwrap_or_default();
    repo.stage(&StageSelection::from_files(files))?;
    repo.commit(message)?;
    Ok(("Commit successful".to_string(), TaskPayload::None))
}

fn delete_branch(repo: &mut dyn RepositoryHandle, request: &TaskRequest) -> Handled {
    let name = required(request, 0, "Branch name")?;
    backend::ensure_deletable(name)?;

    if repo.current_branch().is_ok_and(|current| current == name) {
        let mut switched = Err(GitError::BranchNotFound {
            branch: FALLBACK_BRANCHES.join(" or "),
        });
        for fallback in FALLBACK_BRANCHES {
            switched = repo.checkout(fallback);
            if switched.is_ok() {
                info!(repo = %repo.path().display(), branch = %fallback, "switched away from branch being deleted");
                break;
            }
        }
        switched?;
    }

    repo.delete_branch(name)?;
    Ok((format!("{name} deleted"), TaskPayload::None))
}

fn merge(repo: &mut dyn RepositoryHandle, request: &TaskRequest) -> Handled {
    let source = required(request, 0, "Source branch")?;
    let outcome = repo.merge(source)?;

    if outcome.changed_head()
        && repo
            .current_branch()
            .is_ok_and(|current| backend::is_protected(&current))
    {
        match repo.delete_branch(source) {
            Ok(()) => info!(repo = %repo.path().display(), branch = %source, "deleted merged branch"),
            Err(e) => warn!(repo = %repo.path().display(), branch = %source, error = %e, "could not delete merged branch"),
        }
    }

    Ok((outcome.message().to_string(), TaskPayload::Merge(Some(outcome))))
}
