use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserType;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Password hashing failed")]
    Hashing,
}

/// Bearer token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_type: UserType,
    pub iat: u64,
    pub exp: u64,
}

/// Password hashing and session tokens
///
/// Stored hashes look like `hex(salt)$hex(hmac)` where the HMAC key is the
/// server pepper and the message is salt followed by the password.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: u64,
    password_pepper: String,
    admin_signup_key: Option<String>,
}

impl AuthService {
    pub fn new(
        jwt_secret: &str,
        token_ttl_secs: u64,
        password_pepper: String,
        admin_signup_key: Option<String>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl_secs,
            password_pepper,
            admin_signup_key: admin_signup_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = Uuid::new_v4();
        let digest = self.digest(salt.as_bytes(), password)?;
        Ok(format!("{}${}", hex::encode(salt.as_bytes()), hex::encode(digest)))
    }

    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
            return false;
        };
        let Ok(computed) = self.digest(&salt, password) else {
            return false;
        };

        computed.as_slice().ct_eq(&expected).into()
    }

    fn digest(&self, salt: &[u8], password: &str) -> Result<Vec<u8>, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.password_pepper.as_bytes()).map_err(|_| AuthError::Hashing)?;
        mac.update(salt);
        mac.update(password.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    pub fn issue_token(&self, user_id: &str, user_type: UserType) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            user_type,
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Admin accounts need the configured signup key; without one, admin signup is closed
    pub fn check_admin_key(&self, provided: Option<&str>) -> Result<(), AuthError> {
        match (&self.admin_signup_key, provided) {
            (Some(expected), Some(given)) if bool::from(expected.as_bytes().ct_eq(given.as_bytes())) => Ok(()),
            _ => Err(AuthError::Forbidden("admin signup requires a valid admin key".to_string())),
        }
    }
}
