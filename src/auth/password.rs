use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

use crate::config::PasswordCost;

/// Underlying cryptographic failure while hashing. The message never contains the secret.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashingFailure(String);

/// One-way salted hashing of user secrets (Argon2id, PHC string output).
#[derive(Debug, Clone, Copy)]
pub struct PasswordVault {
    cost: PasswordCost,
}

impl PasswordVault {
    pub fn new(cost: PasswordCost) -> Self {
        Self { cost }
    }

    fn hasher(&self) -> Result<Argon2<'static>, HashingFailure> {
        let params = Params::new(self.cost.memory_kib, self.cost.iterations, self.cost.parallelism, None)
            .map_err(|e| HashingFailure(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, secret: &str) -> Result<String, HashingFailure> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| HashingFailure(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashingFailure(e.to_string()))?;

        let phc = self
            .hasher()?
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashingFailure(e.to_string()))?;
        Ok(phc.to_string())
    }

    /// True iff `candidate` matches `hashed`. Comparison is constant-time; an
    /// unparseable stored hash simply fails verification.
    pub fn verify(&self, hashed: &str, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hashed) else {
            return false;
        };
        // Cost parameters are read back from the PHC string, not from self
        Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok()
    }

    /// Always false, but spends one full hash at the configured cost so a
    /// missing account takes as long to reject as a wrong secret.
    pub fn verify_absent(&self, candidate: &str) -> bool {
        if let Err(e) = self.hash(candidate) {
            tracing::error!("{}", e);
        }
        false
    }
}
