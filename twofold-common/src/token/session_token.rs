use crate::token::{Expiring, HmacSha256Verifier, Token, TokenError};

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const SESSION_TOKEN_NAME: &str = "SessionToken";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewSessionTokenClaims<'a> {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: &'a str,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

impl<'a> NewSessionTokenClaims<'a> {
    pub fn expiring_after(user_id: Uuid, user_email: &'a str, lifetime: Duration) -> Self {
        let expiration = (SystemTime::now() + lifetime)
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Self {
            user_id,
            user_email,
            expiration,
        }
    }
}

impl Expiring for SessionTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

pub struct SessionToken {}

impl SessionToken {
    pub fn sign_new(
        claims: NewSessionTokenClaims,
        signing_key: &[u8],
    ) -> Result<String, TokenError> {
        Self::encode(&claims, signing_key)
    }
}

impl Token for SessionToken {
    type Claims = SessionTokenClaims;
    type Verifier = HmacSha256Verifier;

    fn token_name() -> &'static str {
        SESSION_TOKEN_NAME
    }
}
