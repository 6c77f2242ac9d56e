use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;

use crate::error::{Result, StashError};

const SALT_LEN: usize = 16;

/// Hash `password` into a PHC string with a fresh random salt.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|err| StashError::PasswordHash(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| StashError::PasswordHash(err.to_string()))
}

pub(crate) fn verify_password(encoded: &str, password: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(encoded).map_err(|err| StashError::PasswordHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original() {
        let encoded = hash_password("correct horse").unwrap();
        assert!(encoded.starts_with("$argon2"));
        assert!(verify_password(&encoded, "correct horse").unwrap());
        assert!(!verify_password(&encoded, "battery staple").unwrap());
    }

    #[test]
    fn salts_differ_between_calls() {
        assert_ne!(hash_password("x").unwrap(), hash_password("x").unwrap());
    }
}
