use twofold_common::token::session_token::{SessionToken, SessionTokenClaims};
use twofold_common::token::{Token, TokenError};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::marker::PhantomData;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::TokenLocation;

/// The claims of a session token whose signature and expiration have been checked.
#[derive(Debug)]
pub struct VerifiedToken<L: TokenLocation> {
    pub claims: SessionTokenClaims,
    #[allow(dead_code)]
    pub from_cookie: bool,
    _marker: PhantomData<L>,
}

impl<L> FromRequest for VerifiedToken<L>
where
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match get_and_verify_token::<L>(req) {
            Ok((claims, from_cookie)) => future::ok(VerifiedToken {
                claims,
                from_cookie,
                _marker: PhantomData,
            }),
            Err(e) => future::err(e.into()),
        }
    }
}

#[inline]
fn get_and_verify_token<L: TokenLocation>(
    req: &HttpRequest,
) -> Result<(SessionTokenClaims, bool), TokenError> {
    let extracted = match L::get_from_request(req, SessionToken::token_name()) {
        Some(t) => t,
        None => return Err(TokenError::TokenMissing),
    };

    let decoded = SessionToken::decode(extracted.value.as_ref())?;
    let claims = decoded.verify(&env::CONF.session_signing_key)?;

    Ok((claims.clone(), extracted.from_cookie))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use twofold_common::token::session_token::NewSessionTokenClaims;
    use uuid::Uuid;

    use crate::middleware::{FromHeader, FromHeaderOrCookie};

    fn sign(user_id: Uuid, expiration: u64, key: &[u8]) -> String {
        let claims = NewSessionTokenClaims {
            user_id,
            user_email: "test1234@example.com",
            expiration,
        };

        SessionToken::sign_new(claims, key).unwrap()
    }

    fn exp_in(secs: u64) -> u64 {
        (SystemTime::now() + Duration::from_secs(secs))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[actix_web::test]
    async fn test_verified_from_header() {
        let user_id = Uuid::now_v7();
        let token = sign(user_id, exp_in(10), &env::CONF.session_signing_key);

        let req = TestRequest::default()
            .insert_header(("SessionToken", token.as_str()))
            .to_http_request();

        let verified = VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(verified.claims.user_id, user_id);
        assert!(!verified.from_cookie);

        assert!(
            VerifiedToken::<FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_ok()
        );
    }

    #[actix_web::test]
    async fn test_verified_from_cookie() {
        let user_id = Uuid::now_v7();
        let token = sign(user_id, exp_in(10), &env::CONF.session_signing_key);

        let req = TestRequest::default()
            .cookie(Cookie::new("SessionToken", token))
            .to_http_request();

        let verified = VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(verified.claims.user_id, user_id);
        assert!(verified.from_cookie);

        assert!(
            VerifiedToken::<FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }

    #[actix_web::test]
    async fn test_rejects_missing_expired_and_forged_tokens() {
        let user_id = Uuid::now_v7();

        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::TokenMissing(_))
        ));

        let expired = sign(user_id, exp_in(0) - 1, &env::CONF.session_signing_key);
        let req = TestRequest::default()
            .insert_header(("SessionToken", expired.as_str()))
            .to_http_request();
        assert!(matches!(
            VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::TokenExpired(_))
        ));

        let forged = sign(user_id, exp_in(10), &[0; 64]);
        let req = TestRequest::default()
            .insert_header(("SessionToken", forged.as_str()))
            .to_http_request();
        assert!(matches!(
            VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));

        let req = TestRequest::default()
            .insert_header(("SessionToken", "not-a-token"))
            .to_http_request();
        assert!(
            VerifiedToken::<FromHeaderOrCookie>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }
}
