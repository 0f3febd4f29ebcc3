// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account passwords: policy, Argon2 hashing, and password login.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use flaregate_core::FlareError;
use flaregate_core::types::{ExternalAccount, VerificationSession};
use rand::RngCore;
use tracing::{info, warn};

use crate::verification::normalize_name;
use crate::{Workflow, new_id};

pub const MIN_PASSWORD_LEN: usize = 8;

/// At least [`MIN_PASSWORD_LEN`] characters with one lowercase and one uppercase letter.
pub fn validate_password(password: &str) -> Result<(), FlareError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FlareError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(FlareError::WeakPassword(
            "password must contain a lowercase letter".into(),
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(FlareError::WeakPassword(
            "password must contain an uppercase letter".into(),
        ));
    }
    Ok(())
}

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, FlareError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| FlareError::Internal(format!("salt encoding failed: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FlareError::Internal(format!("password hashing failed: {e}")))
}

/// Checks a password against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Runs a CPU-bound hashing step off the async worker threads.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, FlareError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FlareError::Internal(format!("hashing task failed: {e}")))
}

fn invalid_credentials() -> FlareError {
    FlareError::Unauthorized("invalid credentials".into())
}

impl Workflow {
    /// Stores a password for the verified session's account. Calling again
    /// replaces it.
    pub async fn set_password(
        &self,
        session_id: &str,
        password: &str,
    ) -> Result<ExternalAccount, FlareError> {
        let session = self.find_session(session_id).await?;
        if !session.verified {
            return Err(FlareError::SessionNotVerified {
                session_id: session_id.to_string(),
            });
        }
        validate_password(password)?;

        let password = password.to_string();
        let hash = blocking(move || hash_password(&password)).await??;
        let account = self
            .storage
            .set_account_password(&session.external_account_name, &hash, self.now())
            .await?;

        info!(username = %account.name, "account password set");
        Ok(account)
    }

    /// Logs in with a password and returns an already-verified session.
    ///
    /// Unknown accounts, accounts without a password, and wrong passwords
    /// are indistinguishable to the caller.
    pub async fn login_with_password(
        &self,
        name: &str,
        password: &str,
    ) -> Result<VerificationSession, FlareError> {
        let name = normalize_name(name)?;
        if password.is_empty() {
            return Err(FlareError::Validation("password is required".into()));
        }

        let Some(hash) = self
            .storage
            .get_account(&name)
            .await?
            .and_then(|account| account.password_hash)
        else {
            return Err(invalid_credentials());
        };

        let password = password.to_string();
        if !blocking(move || verify_password(&password, &hash)).await? {
            warn!(username = %name, "password login rejected");
            return Err(invalid_credentials());
        }

        let now = self.now();
        let session = VerificationSession {
            id: new_id(),
            code: self.permanent_code(&name).await?,
            external_account_name: name,
            verified: true,
            attempts: 0,
            locked_until: None,
            expires_at: now + self.settings.code_ttl,
            created_at: now,
        };
        self.storage.create_verification_session(&session).await?;

        info!(session_id = %session.id, username = %session.external_account_name, "password login");
        Ok(session)
    }
}
