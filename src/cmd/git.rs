// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Repository commands for sardine-rs.
//!
//! ```text
//! Command --> task_for() --> TaskQueue::submit --> wait_for(id)
//!                                  |                  |
//!                                  |   Progress ------+--> indicatif bar
//!                                  v                  v
//!                             Dispatcher        render / JSON line
//! ```
//!
//! Every handler returns whether all of its results succeeded.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use flume::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::debug;

use super::render;
use crate::cli::Command;
use crate::cli::repo::{BranchAction, IgnoreArgs, RepoArgs, StatusArgs};
use crate::config::Config;
use crate::error::Result;
use crate::git::backend::create_backend;
use crate::git::{ignore, query};
use crate::task::{
    Dispatcher, QueueEvent, RequestId, TaskKind, TaskPayload, TaskQueue, TaskResult,
};

/// A request built from the command line, not yet queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl TaskSpec {
    fn new(kind: TaskKind, path: &Path, args: Vec<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            args,
        }
    }
}

/// Map a single-repository command to its task.
///
/// Returns `None` for commands that do not go through the queue.
#[must_use]
pub fn task_for(command: &Command) -> Option<TaskSpec> {
    let spec = match command {
        Command::Branches(a) => TaskSpec::new(TaskKind::GetBranches, &a.path, Vec::new()),
        Command::Changes(a) => TaskSpec::new(TaskKind::GetChanges, &a.path, Vec::new()),
        Command::Diff(a) => TaskSpec::new(TaskKind::GetDiff, &a.path, vec![a.file.clone()]),
        Command::Checkout(a) => TaskSpec::new(TaskKind::Checkout, &a.path, vec![a.branch.clone()]),
        Command::Branch(a) => match &a.action {
            BranchAction::Create { path, name } => {
                TaskSpec::new(TaskKind::CreateBranch, path, vec![name.clone()])
            }
            BranchAction::Delete { path, name } => {
                TaskSpec::new(TaskKind::DeleteBranch, path, vec![name.clone()])
            }
        },
        Command::Commit(a) => {
            let args = std::iter::once(a.message.clone())
                .chain(a.files.iter().cloned())
                .collect();
            TaskSpec::new(TaskKind::Commit, &a.path, args)
        }
        Command::Merge(a) => TaskSpec::new(TaskKind::Merge, &a.path, vec![a.source.clone()]),
        Command::Fetch(a) => TaskSpec::new(TaskKind::Fetch, &a.path, Vec::new()),
        Command::Pull(a) => TaskSpec::new(TaskKind::Pull, &a.path, Vec::new()),
        Command::Push(a) => TaskSpec::new(TaskKind::Push, &a.path, Vec::new()),
        Command::Stash(a) => {
            TaskSpec::new(TaskKind::Stash, &a.path, a.message.iter().cloned().collect())
        }
        Command::StashPop(a) => TaskSpec::new(TaskKind::StashPop, &a.path, Vec::new()),
        Command::Reset(a) => TaskSpec::new(TaskKind::Reset, &a.path, Vec::new()),
        Command::Restore(a) => TaskSpec::new(TaskKind::Restore, &a.path, Vec::new()),
        Command::Version
        | Command::Options
        | Command::Status(_)
        | Command::Ignore(_)
        | Command::Head(_) => return None,
    };
    Some(spec)
}

/// Run one queued task and print its result.
///
/// # Errors
///
/// Returns an error if the backend or the queue cannot be started.
pub fn run_task_command(spec: TaskSpec, config: &Config, json: bool) -> Result<bool> {
    let (queue, events) = start_queue(config)?;
    let id = queue.submit(spec.kind, spec.path, spec.args)?;
    let result = wait_for(&events, id, |_, _| {})?;
    print_result(&result, json)?;
    Ok(result.success)
}

/// Check every repository, showing a progress bar on the terminal.
///
/// Paths come from the command line, or from `paths.repos` when none are
/// given.
///
/// # Errors
///
/// Returns an error if no repositories are known or the queue cannot be
/// started.
pub fn run_status_command(args: &StatusArgs, config: &Config, json: bool) -> Result<bool> {
    let paths = if args.paths.is_empty() {
        &config.paths.repos
    } else {
        &args.paths
    };
    if paths.is_empty() {
        return Err(anyhow!(
            "no repositories given; pass PATHS or set paths.repos"
        ));
    }

    let (queue, events) = start_queue(config)?;
    let id = queue.submit(
        TaskKind::CheckAllStatus,
        PathBuf::new(),
        paths.iter().map(|p| p.display().to_string()).collect(),
    )?;

    let bar = (!json).then(|| {
        let bar = ProgressBar::new(100);
        bar.set_style(bar_style());
        bar
    });
    let result = wait_for(&events, id, |percent, label| {
        if let Some(bar) = &bar {
            bar.set_position(u64::from(percent));
            bar.set_message(label.to_string());
        }
    })?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    print_result(&result, json)?;
    let all_ok = match &result.payload {
        TaskPayload::StatusBatch(entries) => {
            entries.iter().all(|e| !e.status.has_error)
        }
        _ => false,
    };
    Ok(result.success && all_ok)
}

/// Append entries to a repository's `.gitignore`.
///
/// # Errors
///
/// Returns an error if `.gitignore` cannot be read or written.
pub fn run_ignore_command(args: &IgnoreArgs, json: bool) -> Result<bool> {
    if !query::is_git_repo(&args.path) {
        print_line(
            &format!("error: not a git repository: {}", args.path.display()),
            json,
        )?;
        return Ok(false);
    }
    let added = ignore::append_entries(&args.path, &args.entries)?;
    if json {
        print_json(&added)?;
    } else if added.is_empty() {
        println!("Nothing to add");
    } else {
        for entry in &added {
            println!("added: {entry}");
        }
    }
    Ok(true)
}

/// Print what HEAD points at.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails; repository errors are
/// printed and reported as failure.
pub fn run_head_command(args: &RepoArgs, json: bool) -> Result<bool> {
    match query::head_info(&args.path) {
        Ok(head) => {
            if json {
                print_json(&head)?;
            } else {
                for line in render::head_lines(&head) {
                    println!("{line}");
                }
            }
            Ok(true)
        }
        Err(e) => {
            print_line(&format!("error: {e}"), json)?;
            Ok(false)
        }
    }
}

fn start_queue(config: &Config) -> Result<(TaskQueue, Receiver<QueueEvent>)> {
    let backend = create_backend(&config.git).context("failed to create repository backend")?;
    debug!(backend = %backend.kind(), "starting task queue");
    Ok(TaskQueue::start(Dispatcher::new(backend))?)
}

/// Block until the result for `id` arrives, forwarding its progress.
fn wait_for(
    events: &Receiver<QueueEvent>,
    id: RequestId,
    mut on_progress: impl FnMut(u8, &str),
) -> Result<TaskResult> {
    loop {
        match events.recv() {
            Ok(QueueEvent::Progress(p)) if p.request_id == id => on_progress(p.percent, &p.label),
            Ok(QueueEvent::Completed(result)) if result.request_id == id => return Ok(result),
            Ok(_) => {}
            Err(_) => return Err(anyhow!("task queue stopped before request {id} completed")),
        }
    }
}

fn print_result(result: &TaskResult, json: bool) -> Result<()> {
    if json {
        return print_json(result);
    }
    for line in render::result_lines(result) {
        if result.success {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    }
    Ok(())
}

fn print_line(line: &str, json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::json!({ "success": false, "message": line }))
    } else {
        eprintln!("{line}");
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn bar_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-")
        })
        .clone()
}
