// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers
//!   config (options), git (queued tasks, ignore, head), render (output)
//! ```

pub mod config;
pub mod git;
pub mod render;

#[cfg(test)]
mod tests;
