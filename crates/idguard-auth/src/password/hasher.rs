//! Argon2id credential hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use idguard_core::error::AppError;

/// Argon2id memory cost in KiB (64 MiB).
const MEMORY_COST_KIB: u32 = 65536;
/// Argon2id time cost (iterations).
const TIME_COST: u32 = 2;
/// Argon2id parallelism (lanes).
const PARALLELISM: u32 = 4;
/// Output tag length in bytes.
const OUTPUT_LEN: usize = 32;

/// Handles credential hashing and verification using Argon2id.
///
/// Hashing is deliberately slow (memory-hard, to resist brute force).
/// Callers must treat both operations as blocking and must not hold any
/// lock across them.
#[derive(Debug, Clone)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a hasher with the fixed production parameters.
    pub fn new() -> Self {
        Self
    }

    /// The configured Argon2id instance.
    fn argon2() -> Argon2<'static> {
        // The parameters are compile-time constants; Params::new only fails
        // on out-of-range values.
        let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
            .expect("Invalid Argon2 params");
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    /// Hashes a plaintext secret with a fresh 16-byte random salt.
    ///
    /// The returned PHC string is self-describing (algorithm, version,
    /// parameters, and salt are embedded), so digests created under older
    /// parameters remain verifiable after a parameter change.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Self::argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext secret against a stored digest.
    ///
    /// Re-derives using the parameters embedded in the digest and compares
    /// the output in constant time. Returns `Ok(true)` on a match,
    /// `Ok(false)` on a mismatch, and an error only for malformed digests.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        match Self::argon2().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash_password("Str0ng!Passw0rd").unwrap();

        assert!(hasher.verify_password("Str0ng!Passw0rd", &hash).unwrap());
        assert!(!hasher.verify_password("Str0ng!Passw0re", &hash).unwrap());
    }

    #[test]
    fn test_digest_is_self_describing() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash_password("Str0ng!Passw0rd").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=65536,t=2,p=4"));
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash_password("Str0ng!Passw0rd").unwrap();
        let second = hasher.hash_password("Str0ng!Passw0rd").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify_password("Str0ng!Passw0rd", &first).unwrap());
        assert!(hasher.verify_password("Str0ng!Passw0rd", &second).unwrap());
    }

    #[test]
    fn test_single_character_variants_rejected() {
        let hasher = PasswordHasher::new();
        let secret = "C0rrect!Horse$Battery";
        let hash = hasher.hash_password(secret).unwrap();

        for i in 0..secret.len() {
            let mut variant: Vec<char> = secret.chars().collect();
            variant[i] = if variant[i] == 'x' { 'y' } else { 'x' };
            let variant: String = variant.into_iter().collect();
            if variant != secret {
                assert!(!hasher.verify_password(&variant, &hash).unwrap());
            }
        }
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify_password("secret", "not-a-phc-string").is_err());
    }
}
