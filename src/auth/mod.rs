//! Verification of externally issued login tokens.
//!
//! User accounts are managed by an external identity issuer that signs JWTs
//! with a shared secret. This module only verifies those tokens, it never
//! issues any.
use crate::settings;

mod jwt;

pub use jwt::{TokenClaims, VerifyError};

/// Context for verifying login tokens against the configured shared secret.
pub struct JwtContext {
    token_secret: String,
}

impl JwtContext {
    pub fn new(auth_settings: settings::Auth) -> Self {
        Self {
            token_secret: auth_settings.token_secret,
        }
    }

    /// Verify a raw bearer token.
    ///
    /// Returns the token claims when the signature matches the shared secret
    /// and the token has not expired.
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        jwt::verify(&self.token_secret, token)
    }
}
