use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

use crate::error::ServiceError;

// 1. CredentialProtector Contract

/// CredentialProtector
///
/// One-way transform from a plaintext credential to an opaque secret that is
/// safe to persist. Each `protect` call salts independently, so equal
/// plaintexts may produce different outputs; the only supported comparison is
/// the `matches` predicate. Implementations must never log or otherwise
/// retain the plaintext beyond the call.
///
/// The protector is carried in the application state as an explicitly
/// injected, stateless strategy (`ProtectorState`), so tests can substitute
/// their own implementation.
pub trait CredentialProtector: Send + Sync {
    /// Transforms a plaintext credential into a storable opaque secret.
    fn protect(&self, plaintext: &str) -> Result<String, ServiceError>;

    /// Verifies a plaintext candidate against a previously protected secret.
    fn matches(&self, plaintext: &str, protected: &str) -> bool;
}

/// ProtectorState
///
/// The concrete type used to share the credential protector across the
/// application state.
pub type ProtectorState = Arc<dyn CredentialProtector>;

// 2. The Argon2id Implementation

/// Argon2Protector
///
/// Salted Argon2id hashing with the library's recommended parameters. Output
/// is a self-describing PHC string, so parameters and salt travel with the
/// stored secret and `matches` needs no extra state.
#[derive(Default)]
pub struct Argon2Protector {
    argon2: Argon2<'static>,
}

impl Argon2Protector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialProtector for Argon2Protector {
    fn protect(&self, plaintext: &str) -> Result<String, ServiceError> {
        // Fresh random salt per call; two hashes of the same plaintext differ.
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            // The argon2 error carries no input material, so it is safe to surface.
            .map_err(|e| ServiceError::Storage(format!("credential hashing failed: {e}")))
    }

    fn matches(&self, plaintext: &str, protected: &str) -> bool {
        PasswordHash::new(protected)
            .map(|parsed| {
                self.argon2
                    .verify_password(plaintext.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
