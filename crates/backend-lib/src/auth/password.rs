// ============================
// recruit-auth/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! KDF work runs on tokio's blocking pool behind a semaphore so a burst of
//! sign-ups cannot occupy the runtime threads that accept connections.
use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use scrypt::Scrypt;
use tokio::sync::{OnceCell, Semaphore};
use zeroize::Zeroizing;

use crate::config::{HashAlgorithm, HashingSettings};
use crate::error::AuthError;

const SALT_BYTES: usize = 16;

/// Bounded hashing pool. Clones share the permits.
#[derive(Clone)]
pub struct PasswordHasherPool {
    settings: Arc<HashingSettings>,
    permits: Arc<Semaphore>,
    /// Hash checked against when the account does not exist
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHasherPool {
    pub fn new(settings: HashingSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self {
            settings: Arc::new(settings),
            permits,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Hash with the configured algorithm; returns a PHC string
    pub async fn hash(&self, password: Zeroizing<String>) -> Result<String, AuthError> {
        let settings = self.settings.clone();
        self.run_blocking(move || hash_with(&settings, &password))
            .await?
    }

    /// Verify against an Argon2 or scrypt PHC string
    pub async fn verify(
        &self,
        password: Zeroizing<String>,
        hash: String,
    ) -> Result<bool, AuthError> {
        self.run_blocking(move || verify_hash(&hash, &password)).await
    }

    /// Compute the dummy hash now so the first unknown-email sign-in costs
    /// the same as every later one. Call once at startup.
    pub async fn warm_up(&self) -> Result<(), AuthError> {
        self.dummy_hash().await.map(|_| ())
    }

    /// Burn one verification for an unknown account; the result is discarded.
    pub async fn verify_dummy(&self, password: Zeroizing<String>) -> Result<(), AuthError> {
        let dummy = self.dummy_hash().await?;
        self.verify(password, dummy).await.map(|_| ())
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        self.dummy_hash
            .get_or_try_init(|| async {
                self.hash(Zeroizing::new("timing-equalization-only".to_string()))
                    .await
            })
            .await
            .cloned()
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T, AuthError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AuthError::Internal("hashing pool closed".to_string()))?;

        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))
    }
}

fn random_salt() -> Result<SaltString, AuthError> {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(|e| AuthError::Internal(format!("salt: {e}")))
}

fn hash_with(settings: &HashingSettings, password: &str) -> Result<String, AuthError> {
    let salt = random_salt()?;
    let hash = match settings.algorithm {
        HashAlgorithm::Argon2id => {
            let params = Params::new(
                settings.memory_kib,
                settings.iterations,
                settings.parallelism,
                None,
            )
            .map_err(|e| AuthError::Internal(format!("argon2 params: {e}")))?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        },
        HashAlgorithm::Scrypt => Scrypt
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string()),
    };
    hash.map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
}

/// Constant-time comparison is done by the KDF crates. Unparsable hashes never match.
pub fn verify_hash(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    let argon2 = Argon2::default();
    parsed
        .verify_password(&[&argon2 as &dyn PasswordVerifier, &Scrypt], password.as_bytes())
        .is_ok()
}
