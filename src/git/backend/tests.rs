// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::credentials::{CredentialResolver, CredentialSource, MAX_ATTEMPTS, key_pairs};
use super::shell::{parse_left_right, parse_porcelain};
use super::{
    BackendOptions, NativeBackend, RepositoryBackend, ShellBackend, ensure_deletable,
    is_protected, remote_display_names, validate_branch_name,
};
use crate::error::GitError;
use crate::git::ignore::IgnoreSet;
use crate::git::types::{FileStatusKind, StageSelection};
use git2::CredentialType;
use std::fs;
use std::path::Path;
use std::process::Command;
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

/// Repository on `main` with one commit containing README.md.
fn init_repo(dir: &Path) {
    git(&["init", "-q", "-b", "main"], dir);
    git(&["config", "user.email", "test@example.com"], dir);
    git(&["config", "user.name", "Test"], dir);
    fs::write(dir.join("README.md"), "# Test\n").unwrap();
    git(&["add", "README.md"], dir);
    git(&["commit", "-q", "-m", "Initial commit"], dir);
}

// --- Shared rules ---

#[test]
fn test_protected_branches() {
    assert!(is_protected("main"));
    assert!(is_protected("master"));
    assert!(!is_protected("Main"));
    assert!(!is_protected("feature"));

    let err = ensure_deletable("master").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"cannot delete protected branch 'master'");
    assert!(ensure_deletable("feature").is_ok());
}

#[test]
fn test_validate_branch_name() {
    assert!(validate_branch_name("feature/x").is_ok());

    let err = validate_branch_name("my feature").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid branch name 'my feature': branch name cannot contain spaces"
    );
    assert!(matches!(
        validate_branch_name(""),
        Err(GitError::InvalidBranchName { .. })
    ));
}

#[test]
fn test_remote_display_names() {
    let local = vec!["main".to_string(), "feature".to_string()];
    let tracking = [
        "origin/HEAD",
        "origin/main",
        "origin/feature",
        "origin/Zeta",
        "origin/alpha",
        "upstream/topic",
        "origin/alpha",
    ];
    let names = remote_display_names("origin", tracking, &local);
    assert_eq!(names, ["alpha", "upstream/topic", "Zeta"]);
}

// --- Credentials ---

#[test]
fn test_credentials_attempt_cap() {
    let resolver = CredentialResolver::with_plan(vec![CredentialSource::Agent; 5]);
    for _ in 0..MAX_ATTEMPTS {
        assert_eq!(
            resolver.next_source(CredentialType::SSH_KEY),
            Some(CredentialSource::Agent)
        );
    }
    assert_eq!(resolver.next_source(CredentialType::SSH_KEY), None);
    assert_eq!(resolver.attempts(), MAX_ATTEMPTS + 1);
    insta::assert_snapshot!(resolver.refusal().unwrap(), @"gave up after 3 attempts");
}

#[test]
fn test_credentials_userpass_refused_immediately() {
    let resolver = CredentialResolver::with_plan(vec![CredentialSource::Agent]);
    assert_eq!(
        resolver.next_source(CredentialType::USER_PASS_PLAINTEXT),
        None
    );
    insta::assert_snapshot!(
        resolver.refusal().unwrap(),
        @"username/password authentication is not supported"
    );
}

#[test]
fn test_credentials_plan_exhausted() {
    let resolver = CredentialResolver::with_plan(Vec::new());
    assert!(!resolver.was_used());
    assert!(resolver.next_source(CredentialType::SSH_KEY).is_none());
    assert!(resolver.was_used());
    assert!(resolver.refusal().is_some());
}

#[test]
fn test_key_pairs_need_private_half() {
    let dir = temp_dir();
    fs::write(dir.path().join("id_ed25519"), "private").unwrap();
    fs::write(dir.path().join("id_ed25519.pub"), "public").unwrap();
    fs::write(dir.path().join("orphan.pub"), "public").unwrap();
    fs::write(dir.path().join("known_hosts"), "").unwrap();

    let pairs = key_pairs(dir.path());
    assert_eq!(
        pairs,
        [CredentialSource::KeyPair {
            public: dir.path().join("id_ed25519.pub"),
            private: dir.path().join("id_ed25519"),
        }]
    );
}

#[test]
fn test_key_pairs_missing_dir() {
    let dir = temp_dir();
    assert!(key_pairs(&dir.path().join("nope")).is_empty());
}

// --- Native backend ---

#[test]
fn test_native_open_rejects_plain_directory() {
    let temp = temp_dir();
    let backend = NativeBackend::default();
    let err = backend.open(temp.path()).err().unwrap();
    assert!(matches!(err, GitError::RepositoryInvalid { .. }));
}

#[test]
fn test_native_open_rejects_subdirectory() {
    let temp = temp_dir();
    init_repo(temp.path());
    let sub = temp.path().join("src");
    fs::create_dir(&sub).unwrap();

    let backend = NativeBackend::default();
    assert!(backend.open(temp.path()).is_ok());
    assert!(matches!(
        backend.open(&sub).err().unwrap(),
        GitError::RepositoryInvalid { .. }
    ));
}

#[test]
fn test_native_changes_split_staged_and_unstaged() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    fs::write(dir.join("README.md"), "# Changed\n").unwrap();
    fs::write(dir.join("staged.txt"), "new\n").unwrap();
    git(&["add", "staged.txt"], dir);
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("loose.txt"), "x\n").unwrap();

    let backend = NativeBackend::default();
    let repo = backend.open(dir).unwrap();
    assert!(repo.has_uncommitted_changes().unwrap());

    let changes = repo.changes().unwrap();
    let staged: Vec<_> = changes
        .staged
        .iter()
        .map(|c| (c.path.as_str(), c.status))
        .collect();
    let unstaged: Vec<_> = changes
        .unstaged
        .iter()
        .map(|c| (c.path.as_str(), c.status))
        .collect();
    assert_eq!(staged, [("staged.txt", FileStatusKind::Staged)]);
    assert_eq!(
        unstaged,
        [
            ("nested/loose.txt", FileStatusKind::Untracked),
            ("README.md", FileStatusKind::Modified),
        ]
    );
}

#[test]
fn test_native_changes_apply_ignore_globs() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    fs::write(dir.join("build.log"), "noise\n").unwrap();
    fs::write(dir.join("keep.txt"), "signal\n").unwrap();

    let options = BackendOptions::builder()
        .ignore(IgnoreSet::new(["*.log"]).unwrap())
        .build();
    let backend = NativeBackend::new(options);
    let repo = backend.open(dir).unwrap();
    let paths: Vec<_> = repo
        .changes()
        .unwrap()
        .unstaged
        .into_iter()
        .map(|c| c.path)
        .collect();
    assert_eq!(paths, ["keep.txt"]);
}

#[test]
fn test_native_stage_commit_and_clean() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    fs::write(dir.join("a.txt"), "a\n").unwrap();

    let backend = NativeBackend::default();
    let repo = backend.open(dir).unwrap();
    repo.stage(&StageSelection::All).unwrap();
    repo.commit("Add a").unwrap();

    assert!(!repo.has_uncommitted_changes().unwrap());
    let err = repo.commit("again").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"nothing to commit");
}

#[test]
fn test_native_branch_lifecycle() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);

    let backend = NativeBackend::default();
    let repo = backend.open(dir).unwrap();
    repo.create_branch("Feature").unwrap();
    repo.create_branch("bugfix").unwrap();
    assert_eq!(
        repo.list_local_branches().unwrap(),
        ["bugfix", "Feature", "main"]
    );

    repo.checkout("bugfix").unwrap();
    assert_eq!(repo.current_branch().unwrap(), "bugfix");
    assert!(repo.delete_branch("bugfix").is_err());

    repo.checkout("main").unwrap();
    repo.delete_branch("bugfix").unwrap();
    assert!(matches!(
        repo.delete_branch("main"),
        Err(GitError::ProtectedBranch { .. })
    ));
    assert!(matches!(
        repo.checkout("missing"),
        Err(GitError::BranchNotFound { .. })
    ));
}

#[test]
fn test_native_detached_head() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    git(&["checkout", "-q", "--detach"], dir);

    let backend = NativeBackend::default();
    let repo = backend.open(dir).unwrap();
    assert!(matches!(
        repo.current_branch(),
        Err(GitError::DetachedHead)
    ));
    assert_eq!(repo.ahead_behind().unwrap(), (0, 0));
}

#[test]
fn test_native_stash_round_trip() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);

    let backend = NativeBackend::default();
    let mut repo = backend.open(dir).unwrap();
    assert!(!repo.stash(None).unwrap());

    fs::write(dir.join("README.md"), "# Stashed\n").unwrap();
    assert!(repo.stash(Some("work")).unwrap());
    assert_eq!(fs::read_to_string(dir.join("README.md")).unwrap(), "# Test\n");

    repo.stash_pop().unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("README.md")).unwrap(),
        "# Stashed\n"
    );
}

#[test]
fn test_native_diff_file() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    fs::write(dir.join("README.md"), "# Test\nmore\n").unwrap();

    let backend = NativeBackend::default();
    let repo = backend.open(dir).unwrap();
    let diff = repo.diff_file("README.md").unwrap();
    assert!(diff.contains("@@"));
    assert!(diff.contains("\n+more\n"));
    assert!(diff.contains("\n # Test\n"));
    assert_eq!(repo.diff_file("missing.txt").unwrap(), "");
}

#[test]
fn test_parse_left_right() {
    assert_eq!(parse_left_right("2\t1\n"), Some((2, 1)));
    assert_eq!(parse_left_right("0 0"), Some((0, 0)));
    assert_eq!(parse_left_right(""), None);
    assert_eq!(parse_left_right("x\t1"), None);
}

#[test]
fn test_parse_porcelain() {
    let text = "M  staged.rs\0 M worktree.rs\0MM both.rs\0?? new.txt\0R  new_name.rs\0old_name.rs\0UU clash.rs\0 D gone.rs\0";
    let summary: Vec<_> = parse_porcelain(text)
        .into_iter()
        .map(|c| (c.path, c.status, c.staged))
        .collect();
    assert_eq!(
        summary,
        [
            ("staged.rs".to_string(), FileStatusKind::Staged, true),
            ("worktree.rs".to_string(), FileStatusKind::Modified, false),
            ("both.rs".to_string(), FileStatusKind::Staged, true),
            ("both.rs".to_string(), FileStatusKind::Modified, false),
            ("new.txt".to_string(), FileStatusKind::Untracked, false),
            ("new_name.rs".to_string(), FileStatusKind::Renamed, true),
            ("clash.rs".to_string(), FileStatusKind::Conflicted, false),
            ("gone.rs".to_string(), FileStatusKind::Deleted, false),
        ]
    );
}

#[test]
fn test_parse_porcelain_keeps_spaces_in_paths() {
    let changes = parse_porcelain("?? dir with space/file name.txt\0");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "dir with space/file name.txt");
}

#[test]
fn test_shell_open_and_branches() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    git(&["branch", "Zeta"], dir);
    git(&["branch", "alpha"], dir);

    let backend = ShellBackend::new(BackendOptions::default()).unwrap();
    assert!(matches!(
        backend.open(temp.path().join("nope").as_path()),
        Err(GitError::RepositoryInvalid { .. })
    ));

    let repo = backend.open(dir).unwrap();
    assert_eq!(repo.current_branch().unwrap(), "main");
    assert_eq!(repo.list_local_branches().unwrap(), ["alpha", "main", "Zeta"]);
    assert_eq!(repo.ahead_behind().unwrap(), (0, 0));
    assert!(!repo.has_uncommitted_changes().unwrap());
}

#[cfg(unix)]
#[test]
fn test_shell_timeout_surfaces_as_command_timeout() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    let hook = dir.join(".git/hooks/pre-commit");
    fs::write(&hook, "#!/bin/sh\nsleep 20\n").unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(dir.join("a.txt"), "a\n").unwrap();

    let options = BackendOptions::builder()
        .command_timeout(Duration::from_secs(1))
        .build();
    let backend = ShellBackend::new(options).unwrap();
    let repo = backend.open(dir).unwrap();
    repo.stage(&StageSelection::All).unwrap();

    let started = Instant::now();
    let err = repo.commit("Add a").unwrap_err();
    assert!(
        matches!(
            err,
            GitError::CommandTimeout { ref command, timeout_secs: 1 } if command == "commit"
        ),
        "unexpected error: {err:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[test]
fn test_shell_stage_commit_and_stash() {
    let temp = temp_dir();
    let dir = temp.path();
    init_repo(dir);
    let backend = ShellBackend::new(BackendOptions::default()).unwrap();
    let mut repo = backend.open(dir).unwrap();

    fs::write(dir.join("a.txt"), "a\n").unwrap();
    repo.stage(&StageSelection::All).unwrap();
    repo.commit("Add a").unwrap();
    assert!(!repo.has_uncommitted_changes().unwrap());
    assert!(matches!(repo.commit("again"), Err(GitError::Generic(m)) if m == "nothing to commit"));

    assert!(!repo.stash(None).unwrap());
    fs::write(dir.join("a.txt"), "changed\n").unwrap();
    assert!(repo.stash(Some("wip")).unwrap());
    assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "a\n");
    repo.stash_pop().unwrap();
    assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "changed\n");
}
