use twofold_common::db::{self, DbAsyncPool};
use twofold_common::request_io::inputs::InputUserUpdate;
use twofold_common::request_io::outputs::OutputUser;

use actix_web::{web, HttpResponse};
use std::borrow::Cow;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn get(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let user_dao = db::user::Dao::new(&db_async_pool);
    let user = match user_dao.get_user_by_id(user_id).await {
        Ok(u) => u,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get user data",
            )));
        }
    };

    let partner_dao = db::partner::Dao::new(&db_async_pool);
    let partner_id = match partner_dao.get_partner_id(user_id).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get partner",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputUser::new(user, partner_id)))
}

pub async fn edit(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    user_update: web::Json<InputUserUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    user_update.validate()?;

    let user_dao = db::user::Dao::new(&db_async_pool);
    match user_dao
        .update_user(
            user_access_token.claims.user_id,
            user_update.name.trim(),
            &user_update.currency,
        )
        .await
    {
        Ok(_) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to edit user",
            )));
        }
    }

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;

    use crate::env;
    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_get_requires_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::get().uri("/user").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get()
            .uri("/user")
            .insert_header(("SessionToken", "garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_edit_rejects_bad_currency() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let token = test_utils::session_token_for(uuid::Uuid::now_v7(), "nobody@example.com");

        let req = TestRequest::put()
            .uri("/user")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({ "name": "Sam", "currency": "euro" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "currency");
    }

    #[actix_web::test]
    #[ignore]
    async fn test_edit() {
        let (_, token) = test_utils::create_user().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::put()
            .uri("/user")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({ "name": "  Renamed  ", "currency": "GBP" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/user")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: serde_json::Value = test_utils::read_json(resp).await;

        assert_eq!(body["name"], "Renamed");
        assert_eq!(body["currency"], "GBP");
    }
}
