// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for sardine-rs using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! sardine [global options] <command>
//! version | options
//! status [PATHS...]
//! branches | changes | head            PATH
//! fetch | pull | push | reset | restore | stash-pop PATH
//! diff PATH FILE
//! checkout PATH BRANCH
//! branch {create|delete} PATH NAME
//! commit PATH -m MSG [FILES...]
//! merge PATH SOURCE
//! stash PATH [-m MSG]
//! ignore PATH ENTRIES...
//! ```

pub mod global;
pub mod repo;

#[cfg(test)]
mod tests;

use crate::cli::global::GlobalOptions;
use crate::cli::repo::{
    BranchArgs, CheckoutArgs, CommitArgs, DiffArgs, IgnoreArgs, MergeArgs, RepoArgs, StashArgs,
    StatusArgs,
};
use clap::{Parser, Subcommand};

/// GitSardine Repository Manager - Rust Port
///
/// Runs git operations on many working copies through one serialized queue.
#[derive(Debug, Parser)]
#[command(
    name = "sardine",
    author,
    version,
    about = "GitSardine Repository Manager",
    long_about = "sardine-rs Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Every repository operation is queued and executed one at a\n\
                  time, so concurrent requests never touch the same working\n\
                  copy at once. See `sardine <command> --help` for details.",
    after_help = "CONFIG FILES:\n\n\
                  sardine reads `sardine.toml` from the current directory when it\n\
                  exists, then every file given with --config, in order. Variables\n\
                  named SARDINE_<SECTION>__<KEY> override the files, and --set\n\
                  overrides everything."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their effective values.
    Options,

    /// Checks the status of every repository.
    Status(StatusArgs),

    /// Lists local and remote branches.
    Branches(RepoArgs),

    /// Lists staged and unstaged changes.
    Changes(RepoArgs),

    /// Shows the working tree diff of one file.
    Diff(DiffArgs),

    /// Switches branches, carrying local changes across.
    Checkout(CheckoutArgs),

    /// Creates or deletes a branch.
    Branch(BranchArgs),

    /// Stages files and commits them.
    Commit(CommitArgs),

    /// Merges a branch into the current one.
    Merge(MergeArgs),

    /// Fetches from the configured remote.
    Fetch(RepoArgs),

    /// Fetches and merges the upstream branch.
    Pull(RepoArgs),

    /// Pushes the current branch.
    Push(RepoArgs),

    /// Stashes local changes.
    Stash(StashArgs),

    /// Restores the most recent stash.
    #[command(name = "stash-pop")]
    StashPop(RepoArgs),

    /// Unstages everything, keeping working tree changes.
    Reset(RepoArgs),

    /// Discards all tracked changes.
    Restore(RepoArgs),

    /// Appends entries to the repository's .gitignore.
    Ignore(IgnoreArgs),

    /// Prints what HEAD points at.
    Head(RepoArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
