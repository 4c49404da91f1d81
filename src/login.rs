//! Login hash store gating the interactive surface.
//!
//! Stores a single hex-encoded SHA-256 digest of the login password and
//! registers the first password it is ever given. This is independent of
//! container passwords and protects nothing but access to the commands.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No credential existed; this password is now the credential.
    Registered,
    Accepted,
    Rejected,
}

/// Hex-encoded SHA-256 digest of a login password.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Compares the attempt against the stored credential, or stores it as the
/// new credential when the store is empty or absent.
pub fn authenticate_or_register(store: &Path, password: &str) -> Result<LoginOutcome> {
    let stored = match fs::read_to_string(store) {
        Ok(contents) => contents.trim().to_string(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).context("failed to read login store"),
    };

    if stored.is_empty() {
        if let Some(parent) = store.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(store, hash_password(password)).context("could not create login store")?;
        return Ok(LoginOutcome::Registered);
    }

    let attempt = hash_password(password);
    if bool::from(attempt.as_bytes().ct_eq(stored.as_bytes())) {
        Ok(LoginOutcome::Accepted)
    } else {
        Ok(LoginOutcome::Rejected)
    }
}
