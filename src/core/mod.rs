// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Core runtime support.
//!
//! ```text
//!      core
//!       |
//!       v
//!    process
//!       |
//!   Builder --> tokio Command --> Output
//!   (git subprocess backend)
//! ```

pub mod process;
