use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::{debug, trace};
use rand_core::OsRng;

#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct HashError(argon2::password_hash::Error);

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);

    // Argon2 with default params (Argon2id v19)
    let argon2 = Argon2::default();

    // Hash password to PHC string ($argon2id$v=19$...)
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(HashError)?
        .to_string();

    trace!("Hashed password");
    Ok(password_hash)
}

/// Whether `password` matches the stored PHC `hash`.
///
/// A malformed hash never matches.
pub fn check_passwords(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("Stored password hash is malformed: {}", err);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
