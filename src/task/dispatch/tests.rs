// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::Dispatcher;
use crate::config::types::BackendKind;
use crate::error::GitResult;
use crate::git::backend::{BackendOptions, NativeBackend, RepositoryBackend, RepositoryHandle};
use crate::git::diff::BinaryDenylist;
use crate::task::{QueueEvent, TaskKind, TaskPayload, TaskQueue, TaskResult};
use flume::Receiver;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn git(args: &[&str], cwd: &Path) {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init_repo(dir: &Path) {
    git(&["init", "-q", "-b", "main"], dir);
    git(&["config", "user.email", "test@example.com"], dir);
    git(&["config", "user.name", "Test"], dir);
    fs::write(dir.join("README.md"), "# Test\n").unwrap();
    git(&["add", "README.md"], dir);
    git(&["commit", "-q", "-m", "Initial commit"], dir);
}

fn git_stdout(args: &[&str], cwd: &Path) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Native backend that counts how often a repository is opened.
struct CountingBackend {
    inner: NativeBackend,
    opens: Arc<AtomicUsize>,
}

impl RepositoryBackend for CountingBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn options(&self) -> &BackendOptions {
        self.inner.options()
    }

    fn open<'a>(&'a self, path: &Path) -> GitResult<Box<dyn RepositoryHandle + 'a>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }
}

fn start_native() -> (TaskQueue, Receiver<QueueEvent>) {
    TaskQueue::start(Dispatcher::new(Box::new(NativeBackend::default()))).unwrap()
}

fn run(queue: &TaskQueue, events: &Receiver<QueueEvent>, kind: TaskKind, path: &Path, args: &[&str]) -> TaskResult {
    let id = queue
        .submit(kind, path, args.iter().map(ToString::to_string).collect())
        .unwrap();
    loop {
        if let QueueEvent::Completed(result) = events.recv_timeout(Duration::from_secs(30)).unwrap() {
            assert_eq!(result.request_id, id);
            return result;
        }
    }
}

#[test]
fn test_binary_diff_refused_without_opening() {
    let opens = Arc::new(AtomicUsize::new(0));
    let options = BackendOptions::builder()
        .binary(BinaryDenylist::new([".pdf"]))
        .build();
    let backend = CountingBackend {
        inner: NativeBackend::new(options),
        opens: Arc::clone(&opens),
    };
    let (queue, events) = TaskQueue::start(Dispatcher::new(Box::new(backend))).unwrap();

    let result = run(&queue, &events, TaskKind::GetDiff, Path::new("/nowhere"), &["report.pdf"]);
    assert!(!result.success);
    insta::assert_snapshot!(result.message, @"binary file - diff not available: report.pdf");
    assert_eq!(result.payload, TaskPayload::Diff(String::new()));
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[test]
fn test_invalid_path_fails_only_that_request() {
    let temp = temp_dir();
    init_repo(temp.path());
    let missing = temp.path().join("missing");
    let (queue, events) = start_native();

    let bad = run(&queue, &events, TaskKind::GetBranches, &missing, &[]);
    assert!(!bad.success);
    assert!(bad.message.starts_with("not a git repository: "));

    let good = run(&queue, &events, TaskKind::GetBranches, temp.path(), &[]);
    assert!(good.success);
    let TaskPayload::Branches(branches) = good.payload else {
        panic!("unexpected payload: {:?}", good.payload);
    };
    assert_eq!(branches.current.as_deref(), Some("main"));
    assert_eq!(branches.local, ["main"]);
    assert!(branches.remote.is_empty());
}

#[test]
fn test_missing_arguments() {
    let temp = temp_dir();
    init_repo(temp.path());
    let (queue, events) = start_native();

    let commit = run(&queue, &events, TaskKind::Commit, temp.path(), &[]);
    insta::assert_snapshot!(commit.message, @"Commit message required");
    let checkout = run(&queue, &events, TaskKind::Checkout, temp.path(), &[""]);
    insta::assert_snapshot!(checkout.message, @"Branch name required");
    assert_eq!(checkout.payload, TaskPayload::Checkout(None));
    let merge = run(&queue, &events, TaskKind::Merge, temp.path(), &[]);
    insta::assert_snapshot!(merge.message, @"Source branch required");
}

#[test]
fn test_check_status_on_invalid_path() {
    let temp = temp_dir();
    let (queue, events) = start_native();
    let result = run(&queue, &events, TaskKind::CheckStatus, temp.path(), &[]);
    assert!(!result.success);
    let TaskPayload::Status(status) = result.payload else {
        panic!("unexpected payload");
    };
    assert!(status.has_error);
    assert_eq!(status.error_message, result.message);
}

#[test]
fn test_batch_status_order_and_progress() {
    let temp = temp_dir();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let c = temp.path().join("c");
    for dir in [&a, &b, &c] {
        fs::create_dir(dir).unwrap();
    }
    init_repo(&a);
    init_repo(&c);
    fs::write(c.join("dirty.txt"), "x\n").unwrap();

    let (queue, events) = start_native();
    let paths: Vec<String> = [&a, &b, &c]
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let id = queue
        .submit(TaskKind::CheckAllStatus, PathBuf::new(), paths)
        .unwrap();

    let mut progress = Vec::new();
    let result = loop {
        match events.recv_timeout(Duration::from_secs(30)).unwrap() {
            QueueEvent::Progress(p) => progress.push((p.percent, p.label)),
            QueueEvent::Completed(result) => break result,
        }
    };
    assert_eq!(result.request_id, id);
    assert!(result.success);
    assert_eq!(
        progress,
        [
            (33, "Checking 1/3".to_string()),
            (66, "Checking 2/3".to_string()),
            (100, "Checking 3/3".to_string()),
        ]
    );

    let TaskPayload::StatusBatch(entries) = result.payload else {
        panic!("unexpected payload");
    };
    let summary: Vec<_> = entries
        .iter()
        .map(|e| (e.path.clone(), e.status.has_error, e.status.needs_commit))
        .collect();
    assert_eq!(
        summary,
        [(a, false, false), (b, true, false), (c, false, true)]
    );
}

#[test]
fn test_delete_current_branch_switches_to_main() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    git(&["checkout", "-q", "-b", "topic"], dir);
    let (queue, events) = start_native();

    let result = run(&queue, &events, TaskKind::DeleteBranch, dir, &["topic"]);
    assert!(result.success, "{}", result.message);
    insta::assert_snapshot!(result.message, @"topic deleted");
    assert_eq!(git_stdout(&["branch", "--show-current"], dir), "main");
    assert_eq!(git_stdout(&["branch", "--list", "topic"], dir), "");

    for protected in ["main", "master"] {
        let result = run(&queue, &events, TaskKind::DeleteBranch, dir, &[protected]);
        assert!(!result.success);
    }
}

#[test]
fn test_merge_into_main_deletes_source() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    git(&["checkout", "-q", "-b", "feature"], dir);
    fs::write(dir.join("feature.txt"), "f\n").unwrap();
    git(&["add", "feature.txt"], dir);
    git(&["commit", "-q", "-m", "feature"], dir);
    git(&["checkout", "-q", "main"], dir);
    fs::write(dir.join("main.txt"), "m\n").unwrap();
    git(&["add", "main.txt"], dir);
    git(&["commit", "-q", "-m", "main work"], dir);

    let (queue, events) = start_native();
    let result = run(&queue, &events, TaskKind::Merge, dir, &["feature"]);
    assert!(result.success, "{}", result.message);
    insta::assert_snapshot!(result.message, @"Merge successful");
    assert_eq!(git_stdout(&["log", "-1", "--format=%s"], dir), "Merge branch 'feature'");
    assert_eq!(git_stdout(&["rev-list", "--count", "--merges", "HEAD"], dir), "1");
    assert_eq!(git_stdout(&["branch", "--list", "feature"], dir), "");
}

#[test]
fn test_commit_stages_selected_files() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    fs::write(dir.join("a.txt"), "a\n").unwrap();
    fs::write(dir.join("b.txt"), "b\n").unwrap();
    let (queue, events) = start_native();

    let result = run(&queue, &events, TaskKind::Commit, dir, &["Add a", "a.txt"]);
    insta::assert_snapshot!(result.message, @"Commit successful");
    assert_eq!(git_stdout(&["show", "--name-only", "--format=", "HEAD"], dir), "a.txt");

    let changes = run(&queue, &events, TaskKind::GetChanges, dir, &[]);
    let TaskPayload::Changes(changes) = changes.payload else {
        panic!("unexpected payload");
    };
    assert!(changes.staged.is_empty());
    let unstaged: Vec<_> = changes.unstaged.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(unstaged, ["b.txt"]);
}

#[test]
fn test_stash_reports_whether_anything_was_stashed() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    let (queue, events) = start_native();

    let clean = run(&queue, &events, TaskKind::Stash, dir, &[]);
    assert!(clean.success);
    assert_eq!(clean.payload, TaskPayload::Bool(false));
    insta::assert_snapshot!(clean.message, @"Nothing to stash");

    fs::write(dir.join("README.md"), "# Changed\n").unwrap();
    let dirty = run(&queue, &events, TaskKind::Stash, dir, &["wip"]);
    assert_eq!(dirty.payload, TaskPayload::Bool(true));
    insta::assert_snapshot!(dirty.message, @"Stash created");

    let pop = run(&queue, &events, TaskKind::StashPop, dir, &[]);
    insta::assert_snapshot!(pop.message, @"Stash applied");
    assert_eq!(fs::read_to_string(dir.join("README.md")).unwrap(), "# Changed\n");
}
