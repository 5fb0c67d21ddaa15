// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::cli::repo::BranchAction;
use crate::cli::{Cli, Command};
use crate::config::types::BackendKind;
use clap::Parser;
use std::path::Path;

#[test]
fn test_parse_version() {
    let cli = Cli::try_parse_from(["sardine", "version"]).unwrap();
    assert!(matches!(cli.command, Some(Command::Version)));
    assert!(cli.global.configs.is_empty());
    assert!(!cli.global.json);
}

#[test]
fn test_parse_global_options() {
    let cli = Cli::try_parse_from([
        "sardine",
        "-c",
        "a.toml",
        "--config",
        "b.toml",
        "-l",
        "5",
        "-b",
        "cli",
        "-s",
        "git.remote=upstream",
        "--json",
        "options",
    ])
    .unwrap();
    assert_eq!(cli.global.configs.len(), 2);
    assert_eq!(cli.global.backend, Some(BackendKind::Cli));
    assert!(cli.global.json);
    insta::assert_debug_snapshot!(cli.global.to_config_overrides(), @r#"
    [
        "git.remote=upstream",
        "global.output_log_level=5",
        "global.file_log_level=5",
        "git.backend=cli",
    ]
    "#);
}

#[test]
fn test_log_level_out_of_range() {
    assert!(Cli::try_parse_from(["sardine", "-l", "7", "version"]).is_err());
}

#[test]
fn test_parse_commit() {
    let cli = Cli::try_parse_from([
        "sardine", "commit", "/repo", "-m", "Fix it", "a.txt", "b.txt",
    ])
    .unwrap();
    let Some(Command::Commit(args)) = cli.command else {
        panic!("expected commit");
    };
    assert_eq!(args.path, Path::new("/repo"));
    assert_eq!(args.message, "Fix it");
    assert_eq!(args.files, ["a.txt", "b.txt"]);
}

#[test]
fn test_commit_requires_message() {
    assert!(Cli::try_parse_from(["sardine", "commit", "/repo"]).is_err());
}

#[test]
fn test_parse_branch_delete() {
    let cli = Cli::try_parse_from(["sardine", "branch", "delete", "/repo", "topic"]).unwrap();
    let Some(Command::Branch(args)) = cli.command else {
        panic!("expected branch");
    };
    assert!(matches!(
        args.action,
        BranchAction::Delete { ref name, .. } if name == "topic"
    ));
}

#[test]
fn test_parse_status_without_paths() {
    let cli = Cli::try_parse_from(["sardine", "status"]).unwrap();
    let Some(Command::Status(args)) = cli.command else {
        panic!("expected status");
    };
    assert!(args.paths.is_empty());
}

#[test]
fn test_parse_stash_pop() {
    let cli = Cli::try_parse_from(["sardine", "stash-pop", "/repo"]).unwrap();
    assert!(matches!(cli.command, Some(Command::StashPop(_))));
}

#[test]
fn test_ignore_requires_entries() {
    assert!(Cli::try_parse_from(["sardine", "ignore", "/repo"]).is_err());
}
