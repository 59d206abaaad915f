use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::borrow::Cow;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{secrets_match, FromHeader, TokenLocation};

/// Admits requests carrying `Authorization: Bearer <cron secret>`.
pub struct CronSecret {}

impl FromRequest for CronSecret {
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(header) = FromHeader::get_from_request(req, "Authorization") else {
            return future::err(HttpErrorResponse::TokenMissing(Cow::Borrowed(
                "Missing cron secret",
            )));
        };

        let provided = header.value.strip_prefix("Bearer ").unwrap_or_default();

        if !secrets_match(provided.as_bytes(), env::CONF.cron_secret.as_bytes()) {
            return future::err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
                "Cron secret is incorrect",
            )));
        }

        future::ok(CronSecret {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_cron_secret() {
        let req = TestRequest::default()
            .insert_header((
                "Authorization",
                format!("Bearer {}", env::CONF.cron_secret).as_str(),
            ))
            .to_http_request();
        assert!(CronSecret::from_request(&req, &mut Payload::None).await.is_ok());

        let req = TestRequest::default()
            .insert_header(("Authorization", env::CONF.cron_secret.as_str()))
            .to_http_request();
        assert!(CronSecret::from_request(&req, &mut Payload::None).await.is_err());

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer wrong"))
            .to_http_request();
        assert!(CronSecret::from_request(&req, &mut Payload::None).await.is_err());

        let req = TestRequest::default().to_http_request();
        assert!(CronSecret::from_request(&req, &mut Payload::None).await.is_err());
    }
}
