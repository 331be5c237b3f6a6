/// Security utilities
///
/// This module provides:
/// - A cryptographically secure random source abstraction
/// - Room id and room encryption key generation
/// - Constant-time bearer token comparison for the admin surface
pub mod crypto;

pub use crypto::{tokens_match, OsRandom, SecretGenerationError, SecretGenerator, SecureRandom};
