// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::git::{TaskSpec, task_for};
use super::render::{head_lines, result_lines, status_summary};
use crate::cli::Cli;
use crate::git::query::HeadInfo;
use crate::git::status::{RepoStatus, RepoStatusEntry};
use crate::git::types::{BranchList, ChangeSet, FileChange, FileStatusKind};
use crate::task::{TaskKind, TaskPayload, TaskRequest, TaskResult};
use clap::Parser;
use std::path::PathBuf;

fn spec(argv: &[&str]) -> Option<TaskSpec> {
    let cli = Cli::try_parse_from(std::iter::once("sardine").chain(argv.iter().copied())).unwrap();
    task_for(&cli.command.unwrap())
}

fn ok(kind: TaskKind, payload: TaskPayload) -> TaskResult {
    TaskResult::ok(&TaskRequest::new(1, kind, "/repo", Vec::new()), "", payload)
}

#[test]
fn test_commit_maps_message_then_files() {
    let spec = spec(&["commit", "/repo", "-m", "msg", "a.txt"]).unwrap();
    assert_eq!(spec.kind, TaskKind::Commit);
    assert_eq!(spec.path, PathBuf::from("/repo"));
    assert_eq!(spec.args, ["msg", "a.txt"]);
}

#[test]
fn test_stash_message_is_optional() {
    assert!(spec(&["stash", "/repo"]).unwrap().args.is_empty());
    assert_eq!(spec(&["stash", "/repo", "-m", "wip"]).unwrap().args, ["wip"]);
}

#[test]
fn test_branch_actions_map_to_kinds() {
    let create = spec(&["branch", "create", "/repo", "topic"]).unwrap();
    let delete = spec(&["branch", "delete", "/repo", "topic"]).unwrap();
    assert_eq!((create.kind, delete.kind), (TaskKind::CreateBranch, TaskKind::DeleteBranch));
    assert_eq!(delete.args, ["topic"]);
}

#[test]
fn test_unqueued_commands() {
    assert_eq!(spec(&["status"]), None);
    assert_eq!(spec(&["head", "/repo"]), None);
    assert_eq!(spec(&["ignore", "/repo", "*.log"]), None);
}

#[test]
fn test_status_summary() {
    let status = RepoStatus {
        current_branch: Some("main".to_string()),
        ahead: 2,
        behind: 1,
        needs_commit: true,
        needs_push: true,
        needs_pull: true,
        ..RepoStatus::default()
    };
    insta::assert_snapshot!(status_summary(&status), @"main: uncommitted, ahead 2, behind 1");
    insta::assert_snapshot!(status_summary(&RepoStatus::default()), @"(detached): clean");
    insta::assert_snapshot!(status_summary(&RepoStatus::failed("boom")), @"error: boom");

    let behind_only = RepoStatus {
        current_branch: Some("dev".to_string()),
        behind: 3,
        needs_pull: true,
        ..RepoStatus::default()
    };
    assert!(!behind_only.is_clean());
    insta::assert_snapshot!(status_summary(&behind_only), @"dev: behind 3");
}

#[test]
fn test_status_table_aligns_paths() {
    let entries = vec![
        RepoStatusEntry {
            path: PathBuf::from("/r/a"),
            status: RepoStatus {
                current_branch: Some("main".to_string()),
                ..RepoStatus::default()
            },
        },
        RepoStatusEntry {
            path: PathBuf::from("/r/longer"),
            status: RepoStatus::failed("not a git repository: /r/longer"),
        },
    ];
    let lines = result_lines(&ok(TaskKind::CheckAllStatus, TaskPayload::StatusBatch(entries)));
    insta::assert_snapshot!(lines.join("\n"), @r"
    /r/a       main: clean
    /r/longer  error: not a git repository: /r/longer
    ");
}

#[test]
fn test_branch_lines() {
    let branches = BranchList {
        current: Some("feature".to_string()),
        local: vec!["feature".to_string(), "main".to_string()],
        remote: vec!["release".to_string()],
    };
    let lines = result_lines(&ok(TaskKind::GetBranches, TaskPayload::Branches(branches)));
    insta::assert_snapshot!(lines.join("\n"), @r"
    * feature
      main
      remote: release
    ");
}

#[test]
fn test_change_lines() {
    let changes = ChangeSet::from_entries([
        FileChange::new("src/lib.rs", FileStatusKind::Staged, true),
        FileChange::new("notes.txt", FileStatusKind::Untracked, false),
        FileChange::new("old.rs", FileStatusKind::Deleted, false),
    ]);
    let lines = result_lines(&ok(TaskKind::GetChanges, TaskPayload::Changes(changes)));
    insta::assert_snapshot!(lines.join("\n"), @r"
    staged:
      A src/lib.rs
    unstaged:
      ? notes.txt
      D old.rs
    ");

    let clean = result_lines(&ok(TaskKind::GetChanges, TaskPayload::Changes(ChangeSet::default())));
    assert_eq!(clean, ["nothing to commit"]);
}

#[test]
fn test_failed_result_renders_message() {
    let request = TaskRequest::new(4, TaskKind::Push, "/repo", Vec::new());
    let result = TaskResult::failed(&request, "push rejected: non-fast-forward");
    assert_eq!(result_lines(&result), ["error: push rejected: non-fast-forward"]);
}

#[test]
fn test_head_lines() {
    let head = HeadInfo {
        branch: Some("main".to_string()),
        commit: None,
        has_stash: true,
    };
    insta::assert_snapshot!(head_lines(&head).join("\n"), @r"
    branch: main
    commit: (none)
    stash:  yes
    ");
}
