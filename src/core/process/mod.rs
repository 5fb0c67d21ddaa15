// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Async process spawning and management.
//!
//! ```text
//! ProcessBuilder::new("git")
//!   .args() .cwd() .env() .capture_output() .timeout()
//!   .run()
//!       --> tokio::process::Command
//!           stream stdout/stderr
//!           kill on timeout / drop
//!       --> ProcessOutput { exit_code, stdout, stderr, timed_out }
//! ```

pub mod builder;
mod io;
mod runner;
