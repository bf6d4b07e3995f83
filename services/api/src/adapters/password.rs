//! services/api/src/adapters/password.rs
//!
//! Argon2 implementation of the `PasswordHasher` port.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use quickcart_core::ports::{PasswordHasher, PortError, PortResult};
use tracing::error;

#[derive(Clone, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("Failed to hash password".to_string())
            })
    }

    fn verify(&self, password: &str, password_hash: &str) -> bool {
        let parsed = match PasswordHash::new(password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
