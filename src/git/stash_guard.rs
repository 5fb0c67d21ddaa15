// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Branch switch wrapped in auto-stash / auto-restore.
//!
//! ```text
//! Idle --(already on branch)----------------------------------> done
//!  |
//!  +--(clean)------------------------> checkout --> CheckedOut (NotNeeded)
//!  |
//!  '--(dirty)--> stash --> Stashed --> checkout --ok--> pop --ok--> Settled (Restored)
//!                                         |               '--err--> Settled (Failed, entry kept)
//!                                         '--err--> pop back --> checkout error
//! ```

use serde::Serialize;
use tracing::{info, warn};

use super::backend::RepositoryHandle;
use crate::error::GitResult;

/// Stash message used for the automatic stash.
pub const AUTO_STASH_MESSAGE: &str = "auto-stash";

/// What happened to local changes around a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum StashRestore {
    /// The tree was clean, or the branch was already checked out.
    NotNeeded,
    /// Changes were stashed and reapplied on the new branch.
    Restored,
    /// The checkout succeeded but reapplying failed; the entry is kept.
    Failed(String),
}

/// Outcome of a guarded checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReport {
    pub branch: String,
    pub stash: StashRestore,
}

impl CheckoutReport {
    /// Task result message.
    #[must_use]
    pub fn message(&self) -> String {
        match self.stash {
            StashRestore::Failed(_) => {
                format!("Switched to '{}' but stash restore failed", self.branch)
            }
            StashRestore::NotNeeded | StashRestore::Restored => {
                format!("Switched to branch '{}'", self.branch)
            }
        }
    }
}

/// Check out `branch`, carrying uncommitted changes across.
///
/// # Errors
///
/// Returns the stash error if the changes cannot be stashed, or the checkout
/// error after the stash has been popped back.
pub fn checkout(handle: &mut dyn RepositoryHandle, branch: &str) -> GitResult<CheckoutReport> {
    let report = |stash| CheckoutReport {
        branch: branch.to_string(),
        stash,
    };

    if handle
        .current_branch()
        .is_ok_and(|current| current == branch)
    {
        return Ok(report(StashRestore::NotNeeded));
    }

    let stashed = handle.has_uncommitted_changes()? && handle.stash(Some(AUTO_STASH_MESSAGE))?;

    if let Err(e) = handle.checkout(branch) {
        if stashed && let Err(pop) = handle.stash_pop() {
            warn!(repo = %handle.path().display(), error = %pop, "could not restore auto-stash after failed checkout");
        }
        return Err(e);
    }

    if !stashed {
        return Ok(report(StashRestore::NotNeeded));
    }

    match handle.stash_pop() {
        Ok(()) => {
            info!(repo = %handle.path().display(), branch = %branch, "restored auto-stash");
            Ok(report(StashRestore::Restored))
        }
        Err(e) => {
            warn!(repo = %handle.path().display(), branch = %branch, error = %e, "stash restore failed, entry kept");
            Ok(report(StashRestore::Failed(e.to_string())))
        }
    }
}
