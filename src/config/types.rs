// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration section types.
//!
//! ```text
//! Config: GlobalConfig, GitConfig, PathsConfig
//! BackendKind: Native (libgit2, default) | Cli (git subprocess)
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::logging::LogLevel;

/// Extensions whose diffs are refused without opening the repository.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    ".ods", ".odg", ".odt", ".Z3PRT", ".Z3ASM", ".exe", ".Z3DRW", ".stp", ".step", ".xrs", ".pdf",
];

/// Glob patterns hidden from change listings.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &[".idea/**", "**/__pycache__/**", "venv/**"];

/// Seconds a single git subprocess may run before it is killed.
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 60;

/// Which repository backend executes queued tasks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process libgit2 binding.
    #[default]
    Native,
    /// The `git` executable, one subprocess per operation.
    Cli,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Cli => write!(f, "cli"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "libgit2" => Ok(Self::Native),
            "cli" | "git" => Ok(Self::Cli),
            _ => Err(ConfigError::InvalidValue {
                section: "git".to_string(),
                key: "backend".to_string(),
                message: format!("expected 'native' or 'cli', got '{s}'"),
            }),
        }
    }
}

/// Global configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Log level for console output (0-6).
    pub output_log_level: LogLevel,
    /// Log level for file output (0-6).
    pub file_log_level: LogLevel,
    /// Path to log file; no file log when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Write the file log as JSON lines.
    pub json_log: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            output_log_level: LogLevel::INFO,
            file_log_level: LogLevel::DEBUG,
            log_file: None,
            json_log: false,
        }
    }
}

/// Repository backend and operation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Backend used by the task queue.
    pub backend: BackendKind,
    /// Hard timeout for one git subprocess, in seconds.
    pub command_timeout: u64,
    /// File extensions never diffed (case-insensitive, leading dot).
    pub binary_extensions: Vec<String>,
    /// Globs (relative to the repository root) hidden from change listings.
    pub ignore: Vec<String>,
    /// Remote used by fetch, pull, push and tracking-branch checkout.
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            binary_extensions: DEFAULT_BINARY_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            ignore: DEFAULT_IGNORE_GLOBS.iter().map(ToString::to_string).collect(),
            remote: "origin".to_string(),
        }
    }
}

/// Repository locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Working copies checked by `status` when no paths are given.
    pub repos: Vec<PathBuf>,
}
