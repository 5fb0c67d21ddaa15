// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Config-related commands for sardine-rs.

use crate::config::Config;

/// Display current configuration options.
pub fn run_options_command(config: &Config, config_files: &[String]) {
    for line in config.format_options() {
        println!("{line}");
    }
    if !config_files.is_empty() {
        println!();
        for line in config_files {
            println!("{line}");
        }
    }
}
