// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git operations module.
//!
//! ```text
//!     task handlers                      caller thread
//!   status.rs  stash_guard.rs              query.rs
//!        \        /                     (gix, read-only)
//!         v      v
//!   ,-------------------------,
//!   | backend (traits)        |   diff.rs    ignore.rs
//!   |  RepositoryBackend      |   denylist   globs / .gitignore
//!   |  RepositoryHandle       |
//!   '----+--------------+-----'
//!        |              |
//!        v              v
//!   NativeBackend   ShellBackend
//!   (git2)          (git CLI)
//! ```
//!
//! **`NativeBackend`** - libgit2 in process, SSH credentials via callbacks.
//! **`ShellBackend`** - `git` subprocess with a hard timeout, never prompts.

pub mod backend;
pub mod diff;
pub mod ignore;
pub mod query;
pub mod stash_guard;
pub mod status;
pub mod types;
