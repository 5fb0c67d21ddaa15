// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Backend driving the `git` executable.
//!
//! ```text
//! ShellRepository::op()
//!     ProcessBuilder("git")
//!       cwd = repo, timeout = command_timeout
//!       env: GIT_TERMINAL_PROMPT=0, GCM_INTERACTIVE=never,
//!            GIT_SSH_COMMAND="ssh -o BatchMode=yes ...", LC_ALL=C
//!          |
//!          v
//!     runtime.block_on(run())          (current-thread tokio runtime)
//!          |
//!          +-- timeout  --> GitError::CommandTimeout
//!          +-- exit != 0 -> stderr classified (auth, conflict, generic)
//!          v
//!     stdout parsed (porcelain, for-each-ref, rev-list)
//! ```
//!
//! Git never prompts: credential helpers and SSH run in batch mode, so an
//! operation needing interaction fails instead of hanging the worker.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{BackendOptions, RepositoryBackend, RepositoryHandle};
use crate::config::types::BackendKind;
use crate::core::process::builder::{ProcessBuilder, ProcessFlags, ProcessOutput};
use crate::error::{GitError, GitResult, ProcessError};
use crate::git::diff::DiffFormatter;
use crate::git::types::{ChangeSet, FileChange, FileStatusKind, MergeOutcome, StageSelection};

const SSH_COMMAND: &str = "ssh -o BatchMode=yes -o StrictHostKeyChecking=accept-new";

/// Matched against lowercased stderr.
static AUTH_FAILURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"permission denied \(publickey|authentication failed|could not read (username|password)|host key verification failed|terminal prompts disabled",
    )
    .ok()
});

/// Matched against lowercased stdout and stderr of `git merge`.
static MERGE_CONFLICT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^conflict \(|automatic merge failed").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// Backend executing every operation as a `git` subprocess.
#[derive(Debug)]
pub struct ShellBackend {
    options: BackendOptions,
    git: PathBuf,
    runtime: Runtime,
}

impl ShellBackend {
    /// Locate `git` and start the runtime that drives its subprocesses.
    ///
    /// # Errors
    ///
    /// Returns `GitError::Generic` if `git` is not on PATH or the runtime
    /// cannot be created.
    pub fn new(options: BackendOptions) -> GitResult<Self> {
        let git = ProcessBuilder::which("git")
            .map_err(|e| GitError::Generic(e.to_string()))?
            .program()
            .clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GitError::Generic(format!("failed to start process runtime: {e}")))?;
        debug!(git = %git.display(), "using git executable");
        Ok(Self {
            options,
            git,
            runtime,
        })
    }

    fn command(&self, cwd: &Path, args: &[&str]) -> ProcessBuilder {
        ProcessBuilder::new(&self.git)
            .args(args)
            .cwd(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .env("GIT_SSH_COMMAND", SSH_COMMAND)
            .env("LC_ALL", "C")
            .capture_output()
            .flag(ProcessFlags::ALLOW_FAILURE)
            .timeout(self.options.command_timeout())
    }

    /// Run a prepared command; only spawn failures and timeouts are errors.
    fn execute(&self, builder: ProcessBuilder, subcommand: &str) -> GitResult<ProcessOutput> {
        self.runtime.block_on(builder.run()).map_err(|e| {
            match e.downcast_ref::<ProcessError>() {
                Some(ProcessError::Timeout { timeout_secs, .. }) => GitError::CommandTimeout {
                    command: subcommand.to_string(),
                    timeout_secs: *timeout_secs,
                },
                _ => GitError::Generic(format!("{e:#}")),
            }
        })
    }
}

impl RepositoryBackend for ShellBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cli
    }

    fn options(&self) -> &BackendOptions {
        &self.options
    }

    fn open<'a>(&'a self, path: &Path) -> GitResult<Box<dyn RepositoryHandle + 'a>> {
        let invalid = || GitError::RepositoryInvalid {
            path: path.display().to_string(),
        };
        if !path.is_dir() {
            return Err(invalid());
        }

        let output = self.execute(
            self.command(path, &["rev-parse", "--show-toplevel"]),
            "rev-parse",
        )?;
        if !output.success() {
            return Err(invalid());
        }
        let toplevel = PathBuf::from(output.stdout().trim());
        let same_root = match (toplevel.canonicalize(), path.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_root {
            return Err(invalid());
        }

        debug!(repo = %path.display(), "opened repository (cli)");
        Ok(Box::new(ShellRepository {
            backend: self,
            path: path.to_path_buf(),
        }))
    }
}

/// One working copy addressed through the `git` executable.
pub struct ShellRepository<'a> {
    backend: &'a ShellBackend,
    path: PathBuf,
}

impl ShellRepository<'_> {
    /// Run `git <args>` and return its output whatever the exit code.
    fn git(&self, args: &[&str]) -> GitResult<ProcessOutput> {
        let subcommand = args.first().copied().unwrap_or("git");
        self.backend
            .execute(self.backend.command(&self.path, args), subcommand)
    }

    fn git_stdin(&self, args: &[&str], input: &str) -> GitResult<ProcessOutput> {
        let subcommand = args.first().copied().unwrap_or("git");
        self.backend.execute(
            self.backend.command(&self.path, args).stdin(input),
            subcommand,
        )
    }

    /// Run `git <args>`, failing with git's own message on a non-zero exit.
    fn git_ok(&self, args: &[&str]) -> GitResult<String> {
        let output = self.git(args)?;
        if output.success() {
            Ok(output.stdout().to_string())
        } else {
            Err(GitError::Generic(error_message(&output)))
        }
    }

    /// Whether `git <args>` exits with 0.
    fn git_check(&self, args: &[&str]) -> GitResult<bool> {
        Ok(self.git(args)?.success())
    }

    fn ref_exists(&self, refname: &str) -> GitResult<bool> {
        self.git_check(&["show-ref", "--verify", "--quiet", refname])
    }

    fn remote(&self) -> &str {
        self.backend.options.remote()
    }

    fn ensure_remote(&self) -> GitResult<()> {
        if self.git_check(&["remote", "get-url", self.remote()])? {
            Ok(())
        } else {
            Err(GitError::RemoteNotFound {
                remote: self.remote().to_string(),
            })
        }
    }

    fn ensure_identity(&self) -> GitResult<()> {
        let name = self.git_check(&["config", "user.name"])?;
        let email = self.git_check(&["config", "user.email"])?;
        if name && email {
            Ok(())
        } else {
            Err(GitError::NoIdentity)
        }
    }

    /// Short name of the upstream of HEAD (`origin/main`), if configured.
    fn upstream(&self) -> GitResult<Option<String>> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])?;
        let name = output.stdout().trim();
        Ok((output.success() && !name.is_empty()).then(|| name.to_string()))
    }

    fn network_failure(&self, output: &ProcessOutput) -> GitError {
        let message = error_message(output);
        if matches(&AUTH_FAILURE, &output.stderr().to_lowercase()) {
            GitError::AuthenticationFailed {
                remote: self.remote().to_string(),
                message,
            }
        } else {
            GitError::Generic(message)
        }
    }

    fn merge_rev(&self, rev: &str, label: &str) -> GitResult<MergeOutcome> {
        let is_ancestor = |a: &str, b: &str| -> GitResult<bool> {
            let output = self.git(&["merge-base", "--is-ancestor", a, b])?;
            match output.exit_code() {
                0 => Ok(true),
                1 => Ok(false),
                _ => Err(GitError::Generic(error_message(&output))),
            }
        };

        if is_ancestor(rev, "HEAD")? {
            return Ok(MergeOutcome::UpToDate);
        }
        if is_ancestor("HEAD", rev)? {
            self.git_ok(&["merge", "-q", "--ff-only", rev])?;
            return Ok(MergeOutcome::FastForward);
        }

        self.ensure_identity()?;
        let message = format!("Merge branch '{label}'");
        let output = self.git(&["merge", "-q", "--no-ff", "--no-edit", "-m", &message, rev])?;
        if output.success() {
            return Ok(MergeOutcome::Merged);
        }

        let combined = format!("{}\n{}", output.stdout(), output.stderr()).to_lowercase();
        if matches(&MERGE_CONFLICT, &combined) {
            self.git_ok(&["merge", "--abort"])?;
            debug!(repo = %self.path.display(), "aborted conflicted merge");
            return Err(GitError::MergeConflict {
                source_branch: label.to_string(),
            });
        }
        Err(GitError::Generic(error_message(&output)))
    }

    /// Tracked modifications only; untracked files never block a merge.
    fn has_tracked_changes(&self) -> GitResult<bool> {
        let stdout = self.git_ok(&[
            "status",
            "--porcelain=v1",
            "--untracked-files=no",
            "--ignore-submodules=all",
        ])?;
        Ok(!stdout.trim().is_empty())
    }

    fn stash_head(&self) -> GitResult<Option<String>> {
        let output = self.git(&["rev-parse", "-q", "--verify", "refs/stash"])?;
        Ok(output
            .success()
            .then(|| output.stdout().trim().to_string()))
    }
}

impl RepositoryHandle for ShellRepository<'_> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn current_branch(&self) -> GitResult<String> {
        let output = self.git(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        let name = output.stdout().trim();
        if output.success() && !name.is_empty() {
            Ok(name.to_string())
        } else {
            Err(GitError::DetachedHead)
        }
    }

    fn list_local_branches(&self) -> GitResult<Vec<String>> {
        let stdout = self.git_ok(&["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads"])?;
        let mut names = non_empty_lines(&stdout);
        super::sort_branches(&mut names);
        Ok(names)
    }

    fn list_remote_branches(&self) -> GitResult<Vec<String>> {
        let local = self.list_local_branches()?;
        let stdout =
            self.git_ok(&["for-each-ref", "--format=%(refname:lstrip=2)", "refs/remotes"])?;
        Ok(super::remote_display_names(
            self.remote(),
            non_empty_lines(&stdout),
            &local,
        ))
    }

    fn ahead_behind(&self) -> GitResult<(usize, usize)> {
        if self.upstream()?.is_none() {
            return Ok((0, 0));
        }
        let output = self.git(&["rev-list", "--left-right", "--count", "HEAD...@{u}"])?;
        if !output.success() {
            return Ok((0, 0));
        }
        Ok(parse_left_right(output.stdout()).unwrap_or((0, 0)))
    }

    fn has_uncommitted_changes(&self) -> GitResult<bool> {
        let stdout = self.git_ok(&[
            "status",
            "--porcelain=v1",
            "--untracked-files=normal",
            "--ignore-submodules=all",
        ])?;
        Ok(!stdout.trim().is_empty())
    }

    fn changes(&self) -> GitResult<ChangeSet> {
        let stdout = self.git_ok(&[
            "status",
            "--porcelain=v1",
            "-z",
            "--untracked-files=all",
            "--ignore-submodules=all",
        ])?;
        let ignore = self.backend.options.ignore();
        Ok(ChangeSet::from_entries(
            parse_porcelain(&stdout)
                .into_iter()
                .filter(|c| !ignore.is_ignored(&c.path)),
        ))
    }

    fn stage(&self, selection: &StageSelection) -> GitResult<()> {
        match selection {
            StageSelection::All => {
                self.git_ok(&["add", "-A"])?;
            }
            StageSelection::Files(files) => {
                let mut args = vec!["add", "-A", "--"];
                args.extend(files.iter().map(String::as_str));
                self.git_ok(&args)?;
            }
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> GitResult<()> {
        self.ensure_identity()?;
        let output = self.git_stdin(&["commit", "-q", "-F", "-"], message)?;
        if output.success() {
            info!(repo = %self.path.display(), "committed");
            return Ok(());
        }
        let combined = format!("{}\n{}", output.stdout(), output.stderr());
        if combined.contains("nothing to commit") || combined.contains("no changes added to commit")
        {
            return Err(GitError::Generic("nothing to commit".to_string()));
        }
        Err(GitError::Generic(error_message(&output)))
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        if self.current_branch().is_ok_and(|current| current == branch) {
            return Ok(());
        }

        if !self.ref_exists(&format!("refs/heads/{branch}"))? {
            let remote = self.remote();
            let tracking = format!("{remote}/{branch}");
            if !self.ref_exists(&format!("refs/remotes/{tracking}"))? {
                return Err(GitError::BranchNotFound {
                    branch: branch.to_string(),
                });
            }
            self.git_ok(&["branch", "-q", "--track", branch, &tracking])?;
            info!(repo = %self.path.display(), branch = %branch, remote = %remote, "created tracking branch");
        }

        self.git_ok(&["checkout", "-q", branch, "--"])?;
        info!(repo = %self.path.display(), branch = %branch, "switched branch");
        Ok(())
    }

    fn create_branch(&self, name: &str) -> GitResult<()> {
        super::validate_branch_name(name)?;
        if self.ref_exists(&format!("refs/heads/{name}"))? {
            return Err(GitError::Generic(format!("a branch named '{name}' already exists")));
        }
        if !self.git_check(&["rev-parse", "-q", "--verify", "HEAD"])? {
            return Err(GitError::Generic(
                "cannot create a branch before the first commit".to_string(),
            ));
        }
        self.git_ok(&["branch", "-q", name])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        super::ensure_deletable(name)?;
        if self.current_branch().is_ok_and(|current| current == name) {
            return Err(GitError::Generic(format!(
                "cannot delete the checked-out branch '{name}'"
            )));
        }
        if !self.ref_exists(&format!("refs/heads/{name}"))? {
            return Err(GitError::BranchNotFound {
                branch: name.to_string(),
            });
        }
        self.git_ok(&["branch", "-q", "-D", name])?;
        info!(repo = %self.path.display(), branch = %name, "deleted branch");
        Ok(())
    }

    fn merge(&self, source: &str) -> GitResult<MergeOutcome> {
        if self.has_tracked_changes()? {
            return Err(GitError::DirtyWorkingTree { operation: "merge" });
        }
        let refname = format!("refs/heads/{source}");
        if !self.ref_exists(&refname)? {
            return Err(GitError::BranchNotFound {
                branch: source.to_string(),
            });
        }
        self.merge_rev(&refname, source)
    }

    fn fetch(&self) -> GitResult<()> {
        self.ensure_remote()?;
        debug!(repo = %self.path.display(), remote = %self.remote(), "fetching");
        let output = self.git(&["fetch", "-q", self.remote()])?;
        if output.success() {
            Ok(())
        } else {
            Err(self.network_failure(&output))
        }
    }

    fn push(&self) -> GitResult<()> {
        let branch = self.current_branch()?;
        self.ensure_remote()?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");

        let mut args = vec!["push", "-q", "--porcelain"];
        if self.upstream()?.is_none() {
            args.push("--set-upstream");
        }
        args.push(self.remote());
        args.push(&refspec);

        debug!(repo = %self.path.display(), refspec = %refspec, "pushing");
        let output = self.git(&args)?;
        if output.success() {
            return Ok(());
        }
        if output.stdout().contains("[rejected]") || output.stderr().contains("[rejected]") {
            return Err(GitError::Generic(format!(
                "push rejected: {}",
                error_message(&output)
            )));
        }
        Err(self.network_failure(&output))
    }

    fn pull(&self) -> GitResult<MergeOutcome> {
        if self.has_tracked_changes()? {
            return Err(GitError::DirtyWorkingTree { operation: "pull" });
        }
        self.fetch()?;
        let branch = self.current_branch()?;
        let upstream = self
            .upstream()?
            .ok_or(GitError::NoUpstream { branch })?;
        self.merge_rev(&upstream, &upstream)
    }

    fn stash(&mut self, message: Option<&str>) -> GitResult<bool> {
        let before = self.stash_head()?;
        let mut args = vec!["stash", "push", "-q"];
        if let Some(message) = message {
            args.extend(["-m", message]);
        }
        let output = self.git(&args)?;
        if !output.success() {
            let message = error_message(&output);
            if message.contains("tell me who you are") || message.contains("empty ident") {
                return Err(GitError::NoIdentity);
            }
            return Err(GitError::Generic(message));
        }
        let created = self.stash_head()? != before;
        if created {
            debug!(repo = %self.path.display(), "stashed changes");
        }
        Ok(created)
    }

    fn stash_pop(&mut self) -> GitResult<()> {
        if self.stash_head()?.is_none() {
            return Err(GitError::Generic("no stash entries to restore".to_string()));
        }
        let output = self.git(&["stash", "pop", "-q"])?;
        if output.success() {
            return Ok(());
        }
        let combined = format!("{}\n{}", output.stdout(), output.stderr()).to_lowercase();
        if combined.contains("conflict") || combined.contains("would be overwritten") {
            return Err(GitError::StashConflict);
        }
        Err(GitError::Generic(error_message(&output)))
    }

    fn reset(&self) -> GitResult<()> {
        self.git_ok(&["reset", "-q"])?;
        Ok(())
    }

    fn restore(&self) -> GitResult<()> {
        self.git_ok(&["reset", "-q", "--hard"])?;
        Ok(())
    }

    fn diff_file(&self, file: &str) -> GitResult<String> {
        self.backend.options.binary().check(file)?;

        let untracked = self.git_ok(&["ls-files", "--others", "--exclude-standard", "--", file])?;
        let output = if untracked.trim().is_empty() {
            self.git(&["diff", "--no-color", "--no-ext-diff", "--", file])?
        } else {
            self.git(&[
                "diff",
                "--no-color",
                "--no-ext-diff",
                "--no-index",
                "--",
                "/dev/null",
                file,
            ])?
        };
        // `--no-index` exits 1 when the files differ
        if !matches!(output.exit_code(), 0 | 1) {
            return Err(GitError::Generic(error_message(&output)));
        }

        let mut formatter = DiffFormatter::new();
        formatter.push_text(output.stdout());
        Ok(formatter.finish())
    }
}

/// Git's own explanation of a failed command.
fn error_message(output: &ProcessOutput) -> String {
    let text = if output.stderr().trim().is_empty() {
        output.stdout()
    } else {
        output.stderr()
    };
    let lines = || text.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .find_map(|line| {
            line.strip_prefix("fatal: ")
                .or_else(|| line.strip_prefix("error: "))
        })
        .or_else(|| lines().last())
        .map_or_else(
            || format!("git exited with code {}", output.exit_code()),
            str::to_string,
        )
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `rev-list --left-right --count` output (`"<ahead>\t<behind>"`).
#[must_use]
pub fn parse_left_right(text: &str) -> Option<(usize, usize)> {
    let mut parts = text.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Each record is `XY <path>`; rename and copy records are followed by an
/// extra field holding the original path.
#[must_use]
pub fn parse_porcelain(text: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut fields = text.split('\0').filter(|f| !f.is_empty());

    while let Some(record) = fields.next() {
        let Some((code, path)) = record.split_at_checked(2) else {
            continue;
        };
        let path = path.strip_prefix(' ').unwrap_or(path).to_string();
        let mut chars = code.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };

        if matches!(x, 'R' | 'C') {
            fields.next();
        }

        match (x, y) {
            ('?', '?') => {
                changes.push(FileChange::new(path, FileStatusKind::Untracked, false));
                continue;
            }
            ('!', '!') => continue,
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => {
                changes.push(FileChange::new(path, FileStatusKind::Conflicted, false));
                continue;
            }
            _ => {}
        }

        let staged = match x {
            'R' => Some(FileStatusKind::Renamed),
            'D' => Some(FileStatusKind::Deleted),
            'M' | 'A' | 'C' | 'T' => Some(FileStatusKind::Staged),
            _ => None,
        };
        if let Some(kind) = staged {
            changes.push(FileChange::new(path.clone(), kind, true));
        }

        let unstaged = match y {
            'D' => Some(FileStatusKind::Deleted),
            'R' => Some(FileStatusKind::Renamed),
            'M' | 'T' | 'A' => Some(FileStatusKind::Modified),
            _ => None,
        };
        if let Some(kind) = unstaged {
            changes.push(FileChange::new(path, kind, false));
        }
    }
    changes
}
