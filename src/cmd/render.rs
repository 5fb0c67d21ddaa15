// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Plain-text rendering of task results.

use crate::git::query::HeadInfo;
use crate::git::status::{RepoStatus, RepoStatusEntry};
use crate::git::types::{BranchList, ChangeSet, FileChange};
use crate::task::{TaskPayload, TaskResult};

/// Lines printed for one result.
#[must_use]
pub fn result_lines(result: &TaskResult) -> Vec<String> {
    if !result.success {
        return vec![format!("error: {}", result.message)];
    }

    match &result.payload {
        TaskPayload::Status(status) => vec![status_summary(status)],
        TaskPayload::StatusBatch(entries) => status_table(entries),
        TaskPayload::Branches(branches) => branch_lines(branches),
        TaskPayload::Changes(changes) => change_lines(changes),
        TaskPayload::Diff(text) if text.is_empty() => vec!["no differences".to_string()],
        TaskPayload::Diff(text) => text.lines().map(str::to_string).collect(),
        TaskPayload::Bool(_)
        | TaskPayload::Checkout(_)
        | TaskPayload::Merge(_)
        | TaskPayload::None => vec![result.message.clone()],
    }
}

/// One-line summary such as `main: uncommitted, ahead 2`.
#[must_use]
pub fn status_summary(status: &RepoStatus) -> String {
    if status.has_error {
        return format!("error: {}", status.error_message);
    }

    let branch = status.current_branch.as_deref().unwrap_or("(detached)");
    if status.is_clean() {
        return format!("{branch}: clean");
    }
    let mut flags = Vec::new();
    if status.needs_commit {
        flags.push("uncommitted".to_string());
    }
    if status.needs_push {
        flags.push(format!("ahead {}", status.ahead));
    }
    if status.needs_pull {
        flags.push(format!("behind {}", status.behind));
    }
    format!("{branch}: {}", flags.join(", "))
}

fn status_table(entries: &[RepoStatusEntry]) -> Vec<String> {
    let paths: Vec<String> = entries
        .iter()
        .map(|e| e.path.display().to_string())
        .collect();
    let width = paths.iter().map(String::len).max().unwrap_or(0);
    paths
        .iter()
        .zip(entries)
        .map(|(path, entry)| format!("{path:<width$}  {}", status_summary(&entry.status)))
        .collect()
}

fn branch_lines(branches: &BranchList) -> Vec<String> {
    let mut lines: Vec<String> = branches
        .local
        .iter()
        .map(|name| {
            let marker = if branches.current.as_deref() == Some(name.as_str()) {
                '*'
            } else {
                ' '
            };
            format!("{marker} {name}")
        })
        .collect();
    if branches.current.is_none() {
        lines.insert(0, "* (detached)".to_string());
    }
    lines.extend(branches.remote.iter().map(|name| format!("  remote: {name}")));
    lines
}

fn change_lines(changes: &ChangeSet) -> Vec<String> {
    if changes.is_empty() {
        return vec!["nothing to commit".to_string()];
    }

    let section = |title: &str, files: &[FileChange]| {
        std::iter::once(format!("{title}:"))
            .chain(
                files
                    .iter()
                    .map(|c| format!("  {} {}", c.status.marker(), c.path)),
            )
            .collect::<Vec<_>>()
    };

    let mut lines = Vec::new();
    if !changes.staged.is_empty() {
        lines.extend(section("staged", &changes.staged));
    }
    if !changes.unstaged.is_empty() {
        lines.extend(section("unstaged", &changes.unstaged));
    }
    lines
}

/// Lines printed by `head`.
#[must_use]
pub fn head_lines(head: &HeadInfo) -> Vec<String> {
    vec![
        format!("branch: {}", head.branch.as_deref().unwrap_or("(detached)")),
        format!("commit: {}", head.commit.as_deref().unwrap_or("(none)")),
        format!("stash:  {}", if head.has_stash { "yes" } else { "no" }),
    ]
}
