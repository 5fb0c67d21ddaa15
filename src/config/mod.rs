// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for sardine-rs.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. local sardine.toml (cwd, optional)
//! 3. --config (repeatable, required)
//! 4. SARDINE_* env vars
//! 5. --set / CLI overrides
//! ```
//!
//! # Environment Variable Mapping
//!
//! Sections and keys are joined with a double underscore, since keys
//! themselves contain single underscores:
//!
//! ```text
//! SARDINE_GIT__BACKEND=cli           → git.backend = "cli"
//! SARDINE_GIT__COMMAND_TIMEOUT=120   → git.command_timeout = 120
//! SARDINE_GLOBAL__OUTPUT_LOG_LEVEL=4 → global.output_log_level = 4
//! ```

pub mod loader;
pub mod types;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ConfigError, Result};

pub use loader::ConfigLoader;
use types::{GitConfig, GlobalConfig, PathsConfig};

/// Name of the optional configuration file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sardine.toml";

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Logging options.
    pub global: GlobalConfig,
    /// Backend and git operation options.
    pub git: GitConfig,
    /// Repository locations.
    pub paths: PathsConfig,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sardine_rs::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("sardine.toml")
    ///     .with_env_prefix("SARDINE")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Check value constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero timeout, an extension
    /// without a leading dot, an empty remote name, or a glob that does not
    /// compile.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            section: "git".to_string(),
            key: key.to_string(),
            message,
        };

        if self.git.command_timeout == 0 {
            return Err(invalid(
                "command_timeout",
                "must be greater than zero".to_string(),
            ));
        }
        if let Some(ext) = self
            .git
            .binary_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(invalid(
                "binary_extensions",
                format!("'{ext}' must start with '.'"),
            ));
        }
        if self.git.remote.trim().is_empty() {
            return Err(invalid("remote", "must not be empty".to_string()));
        }
        for pattern in &self.git.ignore {
            wax::Glob::new(pattern)
                .map_err(|e| invalid("ignore", format!("bad glob '{pattern}': {e}")))?;
        }
        Ok(())
    }

    /// Format configuration options for display.
    ///
    /// Output is deterministically ordered using `BTreeMap`, one
    /// `key = value` line per option with aligned keys.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_global_options(&mut options);
        self.format_git_options(&mut options);
        self.format_paths_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_global_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert(
            "global.output_log_level".into(),
            self.global.output_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.file_log_level".into(),
            self.global.file_log_level.as_u8().to_string(),
        );
        options.insert(
            "global.log_file".into(),
            self.global
                .log_file
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        );
        options.insert("global.json_log".into(), self.global.json_log.to_string());
    }

    fn format_git_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("git.backend".into(), self.git.backend.to_string());
        options.insert(
            "git.command_timeout".into(),
            self.git.command_timeout.to_string(),
        );
        options.insert(
            "git.binary_extensions".into(),
            self.git.binary_extensions.join(" "),
        );
        options.insert("git.ignore".into(), self.git.ignore.join(" "));
        options.insert("git.remote".into(), self.git.remote.clone());
    }

    fn format_paths_options(&self, options: &mut BTreeMap<String, String>) {
        let repos: Vec<String> = self
            .paths
            .repos
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        options.insert("paths.repos".into(), repos.join(" "));
    }
}
