// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! SSH credential resolution for the native backend.
//!
//! ```text
//! libgit2 asks for credentials (repeatedly, until one works)
//!        |
//!        v
//! attempt > MAX_ATTEMPTS? --yes--> Err (AuthenticationFailed upstream)
//!        |
//!        v
//! plan (built once): [ssh-agent if SSH_AUTH_SOCK] + [~/.ssh/*.pub with private key]
//!        |
//!        v
//! next untried candidate --> Cred
//!
//! user/password requested --> Err immediately (unsupported)
//! host certificate         --> accepted, logged (trust on first use)
//! ```

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use git2::{CertificateCheckStatus, Cred, CredentialType, RemoteCallbacks};
use tracing::{debug, warn};

/// Attempts allowed before authentication is abandoned.
pub const MAX_ATTEMPTS: usize = 3;

/// One way of authenticating over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Agent,
    KeyPair { public: PathBuf, private: PathBuf },
}

/// Stateful credential callback for one network operation.
#[derive(Debug, Default)]
pub struct CredentialResolver {
    attempts: Cell<usize>,
    plan: RefCell<Option<Vec<CredentialSource>>>,
    next: Cell<usize>,
    /// Why the last request was refused, for the final error message.
    last_refusal: RefCell<Option<String>>,
}

impl CredentialResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a fixed candidate plan.
    #[must_use]
    pub fn with_plan(plan: Vec<CredentialSource>) -> Self {
        Self {
            plan: RefCell::new(Some(plan)),
            ..Self::default()
        }
    }

    /// Number of times credentials were requested.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }

    /// Whether any credential was requested during the operation.
    #[must_use]
    pub fn was_used(&self) -> bool {
        self.attempts.get() > 0
    }

    /// Reason the resolver gave up, if it did.
    #[must_use]
    pub fn refusal(&self) -> Option<String> {
        self.last_refusal.borrow().clone()
    }

    /// Pick the next credential source for a request.
    ///
    /// Returns `None` once the attempt cap is exceeded, when only
    /// user/password is acceptable, or when all candidates were tried.
    pub fn next_source(&self, allowed: CredentialType) -> Option<CredentialSource> {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);

        if attempt > MAX_ATTEMPTS {
            self.refuse(format!("gave up after {MAX_ATTEMPTS} attempts"));
            return None;
        }
        if !allowed.contains(CredentialType::SSH_KEY) {
            let reason = if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                "username/password authentication is not supported"
            } else {
                "no supported authentication method offered"
            };
            self.refuse(reason.to_string());
            return None;
        }

        let mut plan = self.plan.borrow_mut();
        let plan = plan.get_or_insert_with(default_plan);
        let index = self.next.get();
        self.next.set(index + 1);
        let source = plan.get(index).cloned();
        if source.is_none() {
            self.refuse("no usable SSH agent or key in ~/.ssh".to_string());
        }
        source
    }

    fn refuse(&self, reason: String) {
        debug!(reason = %reason, "credential request refused");
        *self.last_refusal.borrow_mut() = Some(reason);
    }

    /// The libgit2 credential callback body.
    ///
    /// # Errors
    ///
    /// Returns a `git2::Error` when no candidate remains.
    pub fn credentials(
        &self,
        url: &str,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        let user = username_from_url.unwrap_or("git");
        debug!(url = %url, user = %user, attempt = self.attempts.get() + 1, "credentials requested");

        while let Some(source) = self.next_source(allowed) {
            let cred = match &source {
                CredentialSource::Agent => Cred::ssh_key_from_agent(user),
                CredentialSource::KeyPair { public, private } => {
                    Cred::ssh_key(user, Some(public), private, None)
                }
            };
            match cred {
                Ok(cred) => {
                    debug!(source = ?source, "offering credential");
                    return Ok(cred);
                }
                Err(e) => debug!(source = ?source, error = %e, "credential unavailable"),
            }
        }

        Err(git2::Error::from_str(
            &self
                .refusal()
                .unwrap_or_else(|| "no credentials available".to_string()),
        ))
    }

    /// Remote callbacks wired to this resolver, with trust-on-first-use
    /// host certificate handling.
    #[must_use]
    pub fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|url, user, allowed| self.credentials(url, user, allowed));
        callbacks.certificate_check(|_cert, host| {
            warn!(host = %host, "accepting host certificate without verification");
            Ok(CertificateCheckStatus::CertificateOk)
        });
        callbacks
    }
}

/// Agent first (when `SSH_AUTH_SOCK` is set), then every key pair in `~/.ssh`.
fn default_plan() -> Vec<CredentialSource> {
    let mut plan = Vec::new();
    if std::env::var_os("SSH_AUTH_SOCK").is_some_and(|sock| !sock.is_empty()) {
        plan.push(CredentialSource::Agent);
    }
    if let Some(home) = dirs::home_dir() {
        plan.extend(key_pairs(&home.join(".ssh")));
    }
    plan
}

/// Key pairs in `dir`: each `*.pub` file whose private half exists.
#[must_use]
pub fn key_pairs(dir: &Path) -> Vec<CredentialSource> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut pairs: Vec<CredentialSource> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "pub") && path.is_file())
        .filter_map(|public| {
            let private = public.with_extension("");
            private.is_file().then_some(CredentialSource::KeyPair { public, private })
        })
        .collect();
    pairs.sort_by(|a, b| match (a, b) {
        (
            CredentialSource::KeyPair { private: a, .. },
            CredentialSource::KeyPair { private: b, .. },
        ) => a.cmp(b),
        _ => std::cmp::Ordering::Equal,
    });
    pairs
}
