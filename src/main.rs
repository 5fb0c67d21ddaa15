// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> Command Dispatch
//!   Version | Options | Status | Ignore | Head | queued task
//! ```

use std::process::ExitCode;

use sardine_rs::cli::global::GlobalOptions;
use sardine_rs::cli::{self, Command};
use sardine_rs::cmd::config::run_options_command;
use sardine_rs::cmd::git::{
    run_head_command, run_ignore_command, run_status_command, run_task_command, task_for,
};
use sardine_rs::config::loader::ConfigLoader;
use sardine_rs::config::{Config, LOCAL_CONFIG_FILE};
use sardine_rs::logging::{LogConfig, init_logging};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    let cli = cli::parse();

    let Some(command) = &cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        return ExitCode::FAILURE;
    };
    if matches!(command, Command::Version) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let loader = match build_config_loader(&cli.global) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let files = loader.format_loaded_files();
    let config = match loader.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&build_log_config(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(command, &config, &files, cli.global.json)
}

fn build_log_config(config: &Config) -> LogConfig {
    LogConfig::builder()
        .with_console_level(config.global.output_log_level)
        .with_file_level(config.global.file_log_level)
        .maybe_with_log_file(
            config
                .global
                .log_file
                .as_ref()
                .map(|p| p.display().to_string()),
        )
        .with_json_file(config.global.json_log)
        .build()
}

fn dispatch_command(command: &Command, config: &Config, files: &[String], json: bool) -> ExitCode {
    let result = match command {
        Command::Version => Ok(true),
        Command::Options => {
            run_options_command(config, files);
            Ok(true)
        }
        Command::Status(args) => run_status_command(args, config, json),
        Command::Ignore(args) => run_ignore_command(args, json),
        Command::Head(args) => run_head_command(args, json),
        other => match task_for(other) {
            Some(spec) => run_task_command(spec, config, json),
            None => Ok(false),
        },
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build_config_loader(global: &GlobalOptions) -> sardine_rs::error::Result<ConfigLoader> {
    let mut loader = ConfigLoader::new().add_toml_file_optional(LOCAL_CONFIG_FILE);
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    let mut loader = loader.with_env_prefix("SARDINE");
    for assignment in global.to_config_overrides() {
        loader = loader.set_assignment(&assignment)?;
    }
    Ok(loader)
}
