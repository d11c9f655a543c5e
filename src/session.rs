//! Password hashing and cookie-session helpers

use actix_session::Session;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use rand::{distributions::Alphanumeric, Rng};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// Verify a password against a stored Argon2 hash.
///
/// A malformed stored hash reads as a failed verification rather than an
/// error; the caller only ever learns pass/fail.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash failed to parse: {}", e);
            false
        }
    }
}

/// Generate an opaque alphanumeric token (verification, unsubscribe and
/// password reset tokens).
pub fn generate_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Record a successful login on the session cookie.
pub fn sign_in(session: &Session, user_id: i32) -> Result<(), actix_session::SessionInsertError> {
    session.renew();
    session.insert(USER_ID_KEY, user_id)
}

/// Drop all session state.
pub fn sign_out(session: &Session) {
    session.purge();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").expect("hashing should work");
        assert!(verify_password(&hash, "correct horse battery staple"));
        assert!(!verify_password(&hash, "wrong password"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-hash", "anything"));
    }

    #[test]
    fn tokens_are_unique_and_sized() {
        let a = generate_token(64);
        let b = generate_token(64);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
