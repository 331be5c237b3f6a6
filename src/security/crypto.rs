use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use base64::Engine;
use getrandom::fill as fill_random;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::protocol::{EncryptionKey, RoomId, ENCRYPTION_KEY_BYTES, ROOM_ID_BYTES};

/// Errors produced while drawing secret material.
#[derive(Debug, Error)]
pub enum SecretGenerationError {
    #[error("failed to obtain secure random bytes")]
    EntropyUnavailable,
}

/// Source of cryptographically secure random bytes.
///
/// Room ids and encryption keys are security sensitive, so they must never be
/// drawn from a general-purpose PRNG. Tests can substitute a deterministic
/// source to exercise collision handling.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), SecretGenerationError>;
}

/// Operating-system CSPRNG backed by `getrandom`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), SecretGenerationError> {
        fill_random(dest).map_err(|_| SecretGenerationError::EntropyUnavailable)
    }
}

/// Produces room ids and room encryption keys.
#[derive(Clone)]
pub struct SecretGenerator {
    source: Arc<dyn SecureRandom>,
}

impl fmt::Debug for SecretGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretGenerator").finish_non_exhaustive()
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

impl SecretGenerator {
    pub fn new(source: Arc<dyn SecureRandom>) -> Self {
        Self { source }
    }

    /// 128-bit unguessable room id, unpadded base64url (22 chars).
    pub fn room_id(&self) -> Result<RoomId, SecretGenerationError> {
        let mut bytes = [0u8; ROOM_ID_BYTES];
        self.source.fill(&mut bytes)?;
        Ok(BASE64_URL.encode(bytes))
    }

    /// 256-bit media encryption key, unpadded base64url.
    pub fn encryption_key(&self) -> Result<EncryptionKey, SecretGenerationError> {
        let mut bytes = [0u8; ENCRYPTION_KEY_BYTES];
        self.source.fill(&mut bytes)?;
        Ok(EncryptionKey::new(BASE64_URL.encode(bytes)))
    }
}

/// Compare a presented bearer token against the configured one in constant time.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
