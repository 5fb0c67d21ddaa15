// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-process backend built on libgit2 (`git2`).
//!
//! ```text
//! NativeBackend::open(path)
//!     Repository::open (exact path, no discovery)
//!          |
//!          v
//! NativeRepository { repo, options }
//!     status    -> statuses() / graph_ahead_behind()
//!     branches  -> branches(Local | Remote)
//!     merge     -> merge_analysis()
//!                   up-to-date | fast-forward | normal (commit, 2 parents)
//!                   conflicts -> hard reset to HEAD + cleanup_state
//!     network   -> CredentialResolver callbacks (agent, ~/.ssh keys, cap 3)
//!     diff      -> diff_index_to_workdir(pathspec) -> DiffFormatter
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    AnnotatedCommit, BranchType, Commit, DiffFormat, DiffOptions, ErrorClass, ErrorCode,
    FetchOptions, IndexAddOption, ObjectType, PushOptions, Repository, ResetType, Signature,
    Status, StatusOptions,
};
use tracing::{debug, info};

use super::credentials::CredentialResolver;
use super::{BackendOptions, RepositoryBackend, RepositoryHandle};
use crate::config::types::BackendKind;
use crate::error::{GitError, GitResult};
use crate::git::diff::DiffFormatter;
use crate::git::types::{ChangeSet, FileChange, FileStatusKind, MergeOutcome, StageSelection};

const INDEX_CHANGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

const WORKTREE_CHANGED: Status = Status::WT_NEW
    .union(Status::WT_MODIFIED)
    .union(Status::WT_DELETED)
    .union(Status::WT_RENAMED)
    .union(Status::WT_TYPECHANGE);

/// Backend executing every operation through libgit2.
#[derive(Debug, Default)]
pub struct NativeBackend {
    options: BackendOptions,
}

impl NativeBackend {
    #[must_use]
    pub const fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

impl RepositoryBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn options(&self) -> &BackendOptions {
        &self.options
    }

    fn open<'a>(&'a self, path: &Path) -> GitResult<Box<dyn RepositoryHandle + 'a>> {
        let invalid = || GitError::RepositoryInvalid {
            path: path.display().to_string(),
        };
        let repo = Repository::open(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => invalid(),
            _ => GitError::from(e),
        })?;
        if repo.is_bare() {
            return Err(invalid());
        }
        debug!(repo = %path.display(), "opened repository (native)");
        Ok(Box::new(NativeRepository {
            repo,
            path: path.to_path_buf(),
            options: &self.options,
        }))
    }
}

/// One open repository; dropped at the end of the task.
pub struct NativeRepository<'a> {
    repo: Repository,
    path: PathBuf,
    options: &'a BackendOptions,
}

impl NativeRepository<'_> {
    fn signature(&self) -> GitResult<Signature<'static>> {
        self.repo.signature().map_err(|_| GitError::NoIdentity)
    }

    /// HEAD commit, `None` on an unborn branch.
    fn head_commit(&self) -> GitResult<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if is_unborn(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Branch name HEAD points at while it has no commits yet.
    fn unborn_branch(&self) -> GitResult<String> {
        let head = self.repo.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string)
            .ok_or(GitError::DetachedHead)
    }

    fn safe_checkout() -> CheckoutBuilder<'static> {
        let mut opts = CheckoutBuilder::new();
        opts.safe();
        opts
    }

    /// Create `<branch>` from `<remote>/<branch>` and track it.
    fn create_tracking_branch(&self, branch: &str) -> GitResult<()> {
        let remote = self.options.remote();
        let not_found = || GitError::BranchNotFound {
            branch: branch.to_string(),
        };
        let remote_ref = self
            .repo
            .find_reference(&format!("refs/remotes/{remote}/{branch}"))
            .map_err(|_| not_found())?;
        let commit = remote_ref.peel_to_commit()?;
        let mut local = self.repo.branch(branch, &commit, false)?;
        local.set_upstream(Some(&format!("{remote}/{branch}")))?;
        info!(repo = %self.path.display(), branch = %branch, remote = %remote, "created tracking branch");
        Ok(())
    }

    fn merge_annotated(
        &self,
        annotated: &AnnotatedCommit<'_>,
        message: &str,
        label: &str,
    ) -> GitResult<MergeOutcome> {
        let (analysis, _) = self.repo.merge_analysis(&[annotated])?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        let target = self.repo.find_commit(annotated.id())?;

        if analysis.is_fast_forward() || analysis.is_unborn() {
            self.repo
                .checkout_tree(target.as_object(), Some(&mut Self::safe_checkout()))?;
            let reflog = format!("merge {label}: Fast-forward");
            match self.repo.head() {
                Ok(mut head) => {
                    head.set_target(target.id(), &reflog)?;
                }
                Err(e) if is_unborn(&e) => {
                    let name = format!("refs/heads/{}", self.unborn_branch()?);
                    self.repo.reference(&name, target.id(), true, &reflog)?;
                }
                Err(e) => return Err(e.into()),
            }
            return Ok(MergeOutcome::FastForward);
        }

        if !analysis.is_normal() {
            return Err(GitError::Generic(format!("cannot merge '{label}'")));
        }

        let sig = self.signature()?;
        self.repo
            .merge(&[annotated], None, Some(&mut Self::safe_checkout()))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            self.abort_merge()?;
            return Err(GitError::MergeConflict {
                source_branch: label.to_string(),
            });
        }

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&head, &target])?;
        self.repo.cleanup_state()?;
        Ok(MergeOutcome::Merged)
    }

    /// Whether tracked files differ from HEAD. Untracked files survive a
    /// merge abort untouched, so they do not count.
    fn has_tracked_changes(&self) -> GitResult<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let tracked = INDEX_CHANGED | WORKTREE_CHANGED.difference(Status::WT_NEW) | Status::CONFLICTED;
        Ok(statuses.iter().any(|entry| entry.status().intersects(tracked)))
    }

    /// Throw away a conflicted merge. Only reached when tracked files were
    /// clean before merging, so nothing but merge results is discarded.
    fn abort_merge(&self) -> GitResult<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo.reset(head.as_object(), ResetType::Hard, None)?;
        self.repo.cleanup_state()?;
        debug!(repo = %self.path.display(), "aborted conflicted merge");
        Ok(())
    }

    fn find_remote(&self) -> GitResult<git2::Remote<'_>> {
        let name = self.options.remote();
        self.repo.find_remote(name).map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => GitError::RemoteNotFound {
                remote: name.to_string(),
            },
            _ => GitError::from(e),
        })
    }

    /// Classify a failed network operation.
    fn network_error(&self, err: &git2::Error, resolver: &CredentialResolver) -> GitError {
        let auth_failure = err.code() == ErrorCode::Auth
            || resolver.refusal().is_some()
            || (resolver.was_used() && err.class() == ErrorClass::Ssh);
        if auth_failure {
            GitError::AuthenticationFailed {
                remote: self.options.remote().to_string(),
                message: resolver
                    .refusal()
                    .unwrap_or_else(|| err.message().to_string()),
            }
        } else {
            GitError::Generic(err.message().to_string())
        }
    }

    fn branch_has_upstream(&self, branch: &str) -> bool {
        self.repo
            .find_branch(branch, BranchType::Local)
            .and_then(|b| b.upstream().map(|_| ()))
            .is_ok()
    }
}

impl RepositoryHandle for NativeRepository<'_> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> GitResult<String> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if is_unborn(&e) => return self.unborn_branch(),
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or(GitError::DetachedHead)
    }

    fn list_local_branches(&self) -> GitResult<Vec<String>> {
        let mut names = branch_names(&self.repo, BranchType::Local)?;
        super::sort_branches(&mut names);
        Ok(names)
    }

    fn list_remote_branches(&self) -> GitResult<Vec<String>> {
        let local = branch_names(&self.repo, BranchType::Local)?;
        let tracking = branch_names(&self.repo, BranchType::Remote)?;
        Ok(super::remote_display_names(
            self.options.remote(),
            tracking,
            &local,
        ))
    }

    fn ahead_behind(&self) -> GitResult<(usize, usize)> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if is_unborn(&e) => return Ok((0, 0)),
            Err(e) => return Err(e.into()),
        };
        let (Some(local_oid), Some(name)) = (head.target(), head.shorthand()) else {
            return Ok((0, 0));
        };
        if !head.is_branch() {
            return Ok((0, 0));
        }
        let branch = self.repo.find_branch(name, BranchType::Local)?;
        let upstream = match branch.upstream() {
            Ok(upstream) => upstream,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok((0, 0)),
            Err(e) => return Err(e.into()),
        };
        let Some(upstream_oid) = upstream.get().target() else {
            return Ok((0, 0));
        };
        Ok(self.repo.graph_ahead_behind(local_oid, upstream_oid)?)
    }

    fn has_uncommitted_changes(&self) -> GitResult<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status().intersects(INDEX_CHANGED | WORKTREE_CHANGED | Status::CONFLICTED)))
    }

    fn changes(&self) -> GitResult<ChangeSet> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .renames_head_to_index(true)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;

        let mut entries = Vec::new();
        for entry in statuses.iter() {
            let status = entry.status();
            let fallback = entry.path().map(str::to_string);

            if status.is_conflicted() {
                if let Some(path) = fallback {
                    entries.push(FileChange::new(path, FileStatusKind::Conflicted, false));
                }
                continue;
            }

            if status.intersects(INDEX_CHANGED) {
                let path = entry
                    .head_to_index()
                    .and_then(|delta| delta.new_file().path().map(path_string))
                    .or_else(|| fallback.clone());
                let kind = if status.is_index_renamed() {
                    FileStatusKind::Renamed
                } else if status.is_index_deleted() {
                    FileStatusKind::Deleted
                } else {
                    FileStatusKind::Staged
                };
                if let Some(path) = path {
                    entries.push(FileChange::new(path, kind, true));
                }
            }

            if status.intersects(WORKTREE_CHANGED) {
                let path = entry
                    .index_to_workdir()
                    .and_then(|delta| delta.new_file().path().map(path_string))
                    .or(fallback);
                let kind = if status.is_wt_new() {
                    FileStatusKind::Untracked
                } else if status.is_wt_deleted() {
                    FileStatusKind::Deleted
                } else if status.is_wt_renamed() {
                    FileStatusKind::Renamed
                } else {
                    FileStatusKind::Modified
                };
                if let Some(path) = path {
                    entries.push(FileChange::new(path, kind, false));
                }
            }
        }

        let ignore = self.options.ignore();
        Ok(ChangeSet::from_entries(
            entries.into_iter().filter(|c| !ignore.is_ignored(&c.path)),
        ))
    }

    fn stage(&self, selection: &StageSelection) -> GitResult<()> {
        let mut index = self.repo.index()?;
        match selection {
            StageSelection::All => {
                index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
                index.update_all(["*"], None)?;
            }
            StageSelection::Files(files) => {
                for file in files {
                    let relative = Path::new(file);
                    if self.path.join(relative).exists() {
                        index.add_path(relative)?;
                    } else {
                        index.remove_path(relative)?;
                    }
                }
            }
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> GitResult<()> {
        let sig = self.signature()?;
        let mut index = self.repo.index()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let parent = self.head_commit()?;

        if let Some(parent) = &parent
            && parent.tree_id() == tree.id()
        {
            return Err(GitError::Generic("nothing to commit".to_string()));
        }

        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!(repo = %self.path.display(), commit = %oid, "committed");
        Ok(())
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        if self.current_branch().is_ok_and(|current| current == branch) {
            return Ok(());
        }

        let local_ref = format!("refs/heads/{branch}");
        match self.repo.find_reference(&local_ref) {
            Ok(_) => {}
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                self.create_tracking_branch(branch)?;
            }
            Err(e) => return Err(e.into()),
        }

        let target = self
            .repo
            .find_reference(&local_ref)?
            .peel(ObjectType::Commit)?;
        self.repo
            .checkout_tree(&target, Some(&mut Self::safe_checkout()))?;
        self.repo.set_head(&local_ref)?;
        info!(repo = %self.path.display(), branch = %branch, "switched branch");
        Ok(())
    }

    fn create_branch(&self, name: &str) -> GitResult<()> {
        super::validate_branch_name(name)?;
        if self.repo.find_branch(name, BranchType::Local).is_ok() {
            return Err(GitError::Generic(format!("a branch named '{name}' already exists")));
        }
        let head = self.head_commit()?.ok_or_else(|| {
            GitError::Generic("cannot create a branch before the first commit".to_string())
        })?;
        self.repo.branch(name, &head, false)?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        super::ensure_deletable(name)?;
        if self.current_branch().is_ok_and(|current| current == name) {
            return Err(GitError::Generic(format!(
                "cannot delete the checked-out branch '{name}'"
            )));
        }
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound {
                branch: name.to_string(),
            })?;
        branch.delete()?;
        info!(repo = %self.path.display(), branch = %name, "deleted branch");
        Ok(())
    }

    fn merge(&self, source: &str) -> GitResult<MergeOutcome> {
        if self.has_tracked_changes()? {
            return Err(GitError::DirtyWorkingTree { operation: "merge" });
        }
        let branch = self
            .repo
            .find_branch(source, BranchType::Local)
            .map_err(|_| GitError::BranchNotFound {
                branch: source.to_string(),
            })?;
        let annotated = self.repo.reference_to_annotated_commit(branch.get())?;
        self.merge_annotated(&annotated, &format!("Merge branch '{source}'"), source)
    }

    fn fetch(&self) -> GitResult<()> {
        let mut remote = self.find_remote()?;
        let resolver = CredentialResolver::new();
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(resolver.callbacks());

        debug!(repo = %self.path.display(), remote = %self.options.remote(), "fetching");
        remote
            .fetch::<&str>(&[], Some(&mut opts), None)
            .map_err(|e| self.network_error(&e, &resolver))?;
        Ok(())
    }

    fn push(&self) -> GitResult<()> {
        let branch = self.current_branch()?;
        let mut remote = self.find_remote()?;
        let resolver = CredentialResolver::new();
        let rejected: RefCell<Option<String>> = RefCell::new(None);

        let mut callbacks = resolver.callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                *rejected.borrow_mut() = Some(format!("{refname}: {status}"));
            }
            Ok(())
        });
        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        debug!(repo = %self.path.display(), refspec = %refspec, "pushing");
        remote
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| self.network_error(&e, &resolver))?;

        if let Some(reason) = rejected.borrow().clone() {
            return Err(GitError::Generic(format!("push rejected: {reason}")));
        }

        if !self.branch_has_upstream(&branch) {
            let upstream = format!("{}/{branch}", self.options.remote());
            let result = self
                .repo
                .find_branch(&branch, BranchType::Local)
                .and_then(|mut b| b.set_upstream(Some(&upstream)));
            if let Err(e) = result {
                debug!(branch = %branch, error = %e, "could not set upstream after push");
            }
        }
        Ok(())
    }

    fn pull(&self) -> GitResult<MergeOutcome> {
        if self.has_tracked_changes()? {
            return Err(GitError::DirtyWorkingTree { operation: "pull" });
        }
        self.fetch()?;

        let branch_name = self.current_branch()?;
        let branch = self.repo.find_branch(&branch_name, BranchType::Local)?;
        let upstream = branch.upstream().map_err(|_| GitError::NoUpstream {
            branch: branch_name.clone(),
        })?;
        let upstream_name = upstream.name()?.unwrap_or(&branch_name).to_string();
        let annotated = self.repo.reference_to_annotated_commit(upstream.get())?;
        self.merge_annotated(
            &annotated,
            &format!("Merge branch '{upstream_name}'"),
            &upstream_name,
        )
    }

    fn stash(&mut self, message: Option<&str>) -> GitResult<bool> {
        let sig = self.signature()?;
        match self.repo.stash_save2(&sig, message, None) {
            Ok(oid) => {
                debug!(repo = %self.path.display(), stash = %oid, "stashed changes");
                Ok(true)
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn stash_pop(&mut self) -> GitResult<()> {
        match self.repo.stash_pop(0, None) {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.code(), ErrorCode::Conflict | ErrorCode::MergeConflict) => {
                Err(GitError::StashConflict)
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(GitError::Generic("no stash entries to restore".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reset(&self) -> GitResult<()> {
        match self.head_commit()? {
            Some(head) => self.repo.reset(head.as_object(), ResetType::Mixed, None)?,
            None => {
                let mut index = self.repo.index()?;
                index.clear()?;
                index.write()?;
            }
        }
        Ok(())
    }

    fn restore(&self) -> GitResult<()> {
        let mut opts = CheckoutBuilder::new();
        opts.force();
        self.repo.checkout_head(Some(&mut opts))?;
        Ok(())
    }

    fn diff_file(&self, file: &str) -> GitResult<String> {
        self.options.binary().check(file)?;

        let mut opts = DiffOptions::new();
        opts.pathspec(file)
            .disable_pathspec_match(true)
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);
        let diff = self.repo.diff_index_to_workdir(None, Some(&mut opts))?;

        let mut formatter = DiffFormatter::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            formatter.push_line(line.origin(), line.content());
            true
        })?;
        Ok(formatter.finish())
    }
}

fn is_unborn(err: &git2::Error) -> bool {
    matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn branch_names(repo: &Repository, kind: BranchType) -> GitResult<Vec<String>> {
    let mut names = Vec::new();
    for branch in repo.branches(Some(kind))? {
        let (branch, _) = branch?;
        if let Some(name) = branch.name()? {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
