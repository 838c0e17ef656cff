use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VerifyError {
    #[error("Token is expired")]
    Expired,
    #[error("Token is invalid")]
    Invalid,
}

/// Contains all claims that are expected in a login token
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (stable account id at the identity issuer)
    pub sub: String,
    /// Email address of the account
    pub email: String,
    /// Human readable display name
    pub name: String,
    /// Expires at, as unix timestamp
    pub exp: i64,
}

/// Verify a raw HS256 signed JWT against the shared secret.
///
/// Returns `Err(_)` if the token is invalid or expired.
pub fn verify(secret: &str, token: &str) -> Result<TokenClaims, VerifyError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        _ => VerifyError::Invalid,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod test {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    static SECRET: &str = "thisisnotasecret";

    fn unix_now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn build_token(secret: &str, exp: i64) -> String {
        let claims = TokenClaims {
            sub: "the-subject".into(),
            email: "user@example.org".into(),
            name: "Test User".into(),
            exp,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token() {
        let token = build_token(SECRET, unix_now() + 300);

        let claims = verify(SECRET, &token).expect("Valid token failed to verify");

        assert_eq!(claims.sub, "the-subject");
        assert_eq!(claims.email, "user@example.org");
        assert_eq!(claims.name, "Test User");
    }

    #[test]
    fn expired_token() {
        let token = build_token(SECRET, unix_now() - 300);

        match verify(SECRET, &token) {
            Ok(_) => panic!("Test must fail, exp is set in the past"),
            Err(e) => assert_eq!(e, VerifyError::Expired),
        }
    }

    #[test]
    fn wrong_secret() {
        let token = build_token("adifferentsecret", unix_now() + 300);

        match verify(SECRET, &token) {
            Ok(_) => panic!("Test must fail, token was signed with another secret"),
            Err(e) => assert_eq!(e, VerifyError::Invalid),
        }
    }

    #[test]
    fn garbage_token() {
        match verify(SECRET, "not.a.token") {
            Ok(_) => panic!("Test must fail, provided garbage input"),
            Err(e) => assert_eq!(e, VerifyError::Invalid),
        }
    }
}
