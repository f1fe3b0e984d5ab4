//! Password hashing and bearer tokens.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. Passwords are stored as
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` with standard base64 fields.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

const PASSWORD_SCHEME: &str = "pbkdf2-sha256";
const PASSWORD_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub username: String,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
            ttl_secs,
        }
    }

    pub fn issue(&self, sub: &str, role: Role, username: &str) -> anyhow::Result<String> {
        let claims = Claims {
            sub: sub.to_string(),
            role,
            username: username.to_string(),
            exp: chrono::Utc::now().timestamp() + self.ttl_secs,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().into_bytes();
    let key = derive_key(password, &salt, PASSWORD_ITERATIONS);
    format!(
        "{}${}${}${}",
        PASSWORD_SCHEME,
        PASSWORD_ITERATIONS,
        B64.encode(salt),
        B64.encode(key)
    )
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != PASSWORD_SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) =
        (iterations.parse::<u32>(), B64.decode(salt), B64.decode(hash))
    else {
        return false;
    };
    let key = derive_key(password, &salt, iterations);
    bool::from(key[..].ct_eq(&expected[..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_right_password() {
        let stored = hash_password("s3cret!");
        assert!(stored.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("s3cret!", &stored));
        assert!(!verify_password("s3cret", &stored));
        assert!(!verify_password("s3cret!", "plaintext"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("abc"), hash_password("abc"));
    }

    #[test]
    fn token_roundtrip() {
        let keys = TokenKeys::new(b"test-secret", 60);
        let token = keys.issue("stu-1", Role::Student, "ana").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = keys.verify(&token).expect("valid token");
        assert_eq!(claims.sub, "stu-1");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.username, "ana");
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new(b"test-secret", -120);
        let token = keys.issue("stu-1", Role::Student, "ana").unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let a = TokenKeys::new(b"a", 60);
        let b = TokenKeys::new(b"b", 60);
        let token = a.issue("x", Role::Admin, "root").unwrap();
        assert_eq!(b.verify(&token), Err(TokenError::BadSignature));
        assert_eq!(a.verify("not-a-token"), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_claims_fail_signature() {
        let keys = TokenKeys::new(b"k", 60);
        let token = keys.issue("stu-1", Role::Student, "ana").unwrap();
        let forged_by = TokenKeys::new(b"other", 60);
        let forged = forged_by.issue("stu-1", Role::Admin, "ana").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
        assert_eq!(keys.verify(&spliced), Err(TokenError::BadSignature));
    }

    #[test]
    fn password_hash_with_wrong_length_is_rejected() {
        let stored = hash_password("s3cret!");
        let truncated = stored.rsplit_once('$').map(|(head, _)| format!("{head}$AAAA")).unwrap();
        assert!(!verify_password("s3cret!", &truncated));
    }
}
