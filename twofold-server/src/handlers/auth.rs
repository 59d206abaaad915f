use twofold_common::db::{self, DaoError, DbAsyncPool};
use twofold_common::models::user::DEFAULT_CURRENCY;
use twofold_common::request_io::inputs::{CredentialPair, InputRegistration};
use twofold_common::request_io::outputs::OutputSession;
use twofold_common::token::session_token::{
    NewSessionTokenClaims, SessionToken, SESSION_TOKEN_NAME,
};
use twofold_common::validators::{self, Validity};

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use uuid::Uuid;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::verification;

const INCORRECT_CREDENTIALS_MSG: &str = "The email address or password was incorrect";

pub async fn register(
    db_async_pool: web::Data<DbAsyncPool>,
    registration: web::Json<InputRegistration>,
) -> Result<HttpResponse, HttpErrorResponse> {
    registration.validate()?;

    let password_hash = verification::hash_password(&registration.password).await?;
    let currency = registration
        .currency
        .as_deref()
        .unwrap_or(DEFAULT_CURRENCY);

    let user_dao = db::user::Dao::new(&db_async_pool);
    let user_id = match user_dao
        .create_user(
            registration.name.trim(),
            &registration.email,
            currency,
            &password_hash,
        )
        .await
    {
        Ok(id) => id,
        Err(DaoError::CannotRunQuery(msg)) => {
            return Err(HttpErrorResponse::ConflictWithExisting(Cow::Borrowed(msg)));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to create user",
            )));
        }
    };

    log::info!("Registered user {user_id}");

    let session_token = new_session_token(user_id, &registration.email.to_lowercase())?;

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&session_token))
        .json(OutputSession {
            user_id,
            session_token,
        }))
}

pub async fn sign_in(
    db_async_pool: web::Data<DbAsyncPool>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(_) = validators::validate_email_address(&credentials.email) {
        return Err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    if credentials.password.len() > validators::MAX_PASSWORD_LENGTH * 4 {
        return Err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    let user_dao = db::user::Dao::new(&db_async_pool);
    let user = match user_dao.get_user_by_email(&credentials.email).await {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            // Same response as a wrong password so that accounts cannot be enumerated
            return Err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
                INCORRECT_CREDENTIALS_MSG,
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get user",
            )));
        }
    };

    if !verification::verify_password(&credentials.password, user.password_hash).await? {
        return Err(HttpErrorResponse::IncorrectCredential(Cow::Borrowed(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    let session_token = new_session_token(user.id, &user.email)?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session_token))
        .json(OutputSession {
            user_id: user.id,
            session_token,
        }))
}

pub async fn sign_out() -> HttpResponse {
    let mut removal = Cookie::build(SESSION_TOKEN_NAME, "").path("/").finish();
    removal.make_removal();

    HttpResponse::Ok().cookie(removal).finish()
}

fn new_session_token(user_id: Uuid, email: &str) -> Result<String, HttpErrorResponse> {
    let claims = NewSessionTokenClaims::expiring_after(user_id, email, env::CONF.session_lifetime);
    Ok(SessionToken::sign_new(claims, &env::CONF.session_signing_key)?)
}

fn session_cookie(session_token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_TOKEN_NAME, session_token.to_owned())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            env::CONF.session_lifetime.as_secs() as i64
        ))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;
    use twofold_common::threadrand::SecureRng;

    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_sign_out_clears_cookie() {
        let app = test::init_service(App::new().configure(crate::services::api::configure)).await;

        let req = TestRequest::post().uri("/auth/signout").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_TOKEN_NAME)
            .unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[actix_web::test]
    async fn test_register_rejects_invalid_fields() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "",
                "email": "not-an-email",
                "password": "short",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["errType"], "InvalidFields");
        assert_eq!(body["fields"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/auth/signin")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"email\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["errType"], "IncorrectlyFormed");
    }

    #[actix_web::test]
    #[ignore]
    async fn test_register_then_sign_in() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let email = format!("test_user{}@test.com", SecureRng::next_u128());

        let req = TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "Alex",
                "email": email,
                "password": "a good password",
                "currency": "USD",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({
                "name": "Alex again",
                "email": email.to_uppercase(),
                "password": "a good password",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = TestRequest::post()
            .uri("/auth/signin")
            .set_json(json!({ "email": email, "password": "a wrong password" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/auth/signin")
            .set_json(json!({ "email": email, "password": "a good password" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        let token = body["sessionToken"].as_str().unwrap();

        let req = TestRequest::get()
            .uri("/user")
            .insert_header(("SessionToken", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["email"], email.as_str());
        assert!(body["partnerId"].is_null());
    }
}
