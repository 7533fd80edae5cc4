//! Shared types used across the codebase

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet for generated identifiers: lowercase ASCII letters then digits
const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Every identifier is exactly this many characters long
pub const IDENTIFIER_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: expected {IDENTIFIER_LEN} characters from [a-z0-9]")]
pub struct InvalidIdentifier;

/// Opaque identifier shared by notes and users.
///
/// Construction goes through [`Identifier::generate`] or [`Identifier::parse`],
/// both of which uphold the `^[a-z0-9]{15}$` format, so a held `Identifier`
/// is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Samples 15 symbols uniformly (with replacement) from `a-z0-9`.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..IDENTIFIER_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Identifier(id)
    }

    pub fn parse(s: &str) -> Result<Self, InvalidIdentifier> {
        if Self::validate(s) {
            Ok(Identifier(s.to_string()))
        } else {
            Err(InvalidIdentifier)
        }
    }

    /// True iff `s` matches `^[a-z0-9]{15}$`
    pub fn validate(s: &str) -> bool {
        s.len() == IDENTIFIER_LEN && s.bytes().all(|b| ALPHABET.contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::validate(&value) {
            Ok(Identifier(value))
        } else {
            Err(InvalidIdentifier)
        }
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}
