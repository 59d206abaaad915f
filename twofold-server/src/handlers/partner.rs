use twofold_common::db::partner::InvitationWithUser;
use twofold_common::db::{self, DbAsyncPool};
use twofold_common::models::user::UserSummary;
use twofold_common::request_io::inputs::{
    FieldError, InputInvitationId, InputInvitationToken, InputPartnerInvite, InputSearchQuery,
};
use twofold_common::request_io::outputs::{
    OutputPartnerId, OutputPartnerInfo, OutputReceivedInvitation, OutputSentInvitation,
    OutputUserSearchResult,
};
use twofold_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use std::time::SystemTime;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn invite(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    invite_data: web::Json<InputPartnerInvite>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let partner_dao = db::partner::Dao::new(&db_async_pool);
    let invitation = partner_dao
        .invite(user_id, invite_data.to_user_id, SystemTime::now())
        .await?;

    let user_dao = db::user::Dao::new(&db_async_pool);
    let recipient = match user_dao.get_user_by_id(invitation.to_user_id).await {
        Ok(u) => UserSummary::from(u),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("No user with the given ID"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get invited user",
            )));
        }
    };

    log::info!(
        "User {user_id} invited {} to be their partner",
        invitation.to_user_id
    );

    Ok(HttpResponse::Created().json(OutputSentInvitation::from(InvitationWithUser {
        invitation,
        other_user: recipient,
    })))
}

pub async fn accept(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    token_data: web::Json<InputInvitationToken>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let partner_dao = db::partner::Dao::new(&db_async_pool);
    let partner_id = partner_dao
        .accept(user_id, &token_data.token, SystemTime::now())
        .await?;

    log::info!("Users {user_id} and {partner_id} are now partners");

    Ok(HttpResponse::Ok().json(OutputPartnerId { partner_id }))
}

pub async fn decline(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    token_data: web::Json<InputInvitationToken>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let partner_dao = db::partner::Dao::new(&db_async_pool);
    partner_dao
        .decline(
            user_access_token.claims.user_id,
            &token_data.token,
            SystemTime::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().finish())
}

pub async fn cancel(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    invitation_data: web::Json<InputInvitationId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let partner_dao = db::partner::Dao::new(&db_async_pool);
    partner_dao
        .cancel(
            user_access_token.claims.user_id,
            invitation_data.invitation_id,
            SystemTime::now(),
        )
        .await?;

    Ok(HttpResponse::Ok().finish())
}

pub async fn remove(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let partner_dao = db::partner::Dao::new(&db_async_pool);
    let former_partner_id = partner_dao.remove_partnership(user_id).await?;

    log::info!("Users {user_id} and {former_partner_id} are no longer partners");

    Ok(HttpResponse::Ok().finish())
}

pub async fn info(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let partner_dao = db::partner::Dao::new(&db_async_pool);

    let partner = match partner_dao.get_partner(user_id).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get partner",
            )));
        }
    };

    let received = match partner_dao
        .get_received_invitations(user_id, SystemTime::now())
        .await
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get invitations",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputPartnerInfo {
        partner,
        received_invitations: received
            .into_iter()
            .map(OutputReceivedInvitation::from)
            .collect(),
    }))
}

pub async fn search(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    query: web::Query<InputSearchQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = validators::validate_search_query(&query.q) {
        return Err(HttpErrorResponse::InvalidFields(vec![FieldError::new(
            "q", msg,
        )]));
    }

    let user_dao = db::user::Dao::new(&db_async_pool);
    let results = match user_dao
        .search_users(query.q.trim(), user_access_token.claims.user_id)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to search users",
            )));
        }
    };

    let output: Vec<OutputUserSearchResult> = results
        .into_iter()
        .map(OutputUserSearchResult::from)
        .collect();

    Ok(HttpResponse::Ok().json(output))
}

pub async fn sent_invitations(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let partner_dao = db::partner::Dao::new(&db_async_pool);
    let sent = match partner_dao
        .get_sent_invitations(user_access_token.claims.user_id, SystemTime::now())
        .await
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get invitations",
            )));
        }
    };

    let output: Vec<OutputSentInvitation> =
        sent.into_iter().map(OutputSentInvitation::from).collect();

    Ok(HttpResponse::Ok().json(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_search_query_too_short() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let token = test_utils::session_token_for(Uuid::now_v7(), "nobody@example.com");

        let req = TestRequest::get()
            .uri("/partner/search?q=a")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "q");

        let req = TestRequest::get()
            .uri("/partner/search")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    #[ignore]
    async fn test_pairing_flow() {
        let (alice_id, alice_token) = test_utils::create_user().await;
        let (bob_id, bob_token) = test_utils::create_user().await;
        let (_, carol_token) = test_utils::create_user().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/partner/invite")
            .insert_header(("SessionToken", alice_token.as_str()))
            .set_json(json!({ "toUserId": alice_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/partner/invite")
            .insert_header(("SessionToken", alice_token.as_str()))
            .set_json(json!({ "toUserId": bob_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let sent: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(sent["to"]["id"], bob_id.to_string());
        assert_eq!(sent["status"], "pending");

        let req = TestRequest::post()
            .uri("/partner/invite")
            .insert_header(("SessionToken", bob_token.as_str()))
            .set_json(json!({ "toUserId": alice_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = TestRequest::post()
            .uri("/partner/invite")
            .insert_header(("SessionToken", carol_token.as_str()))
            .set_json(json!({ "toUserId": bob_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = TestRequest::get()
            .uri("/partner/info")
            .insert_header(("SessionToken", bob_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let info: serde_json::Value = test_utils::read_json(resp).await;
        assert!(info["partner"].is_null());

        let received = info["receivedInvitations"].as_array().unwrap();
        assert_eq!(received.len(), 2);
        let from_alice = received
            .iter()
            .find(|i| i["from"]["id"] == alice_id.to_string())
            .unwrap();
        let token = from_alice["token"].as_str().unwrap();

        let req = TestRequest::post()
            .uri("/partner/accept")
            .insert_header(("SessionToken", alice_token.as_str()))
            .set_json(json!({ "token": token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/partner/accept")
            .insert_header(("SessionToken", bob_token.as_str()))
            .set_json(json!({ "token": token }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let accepted: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(accepted["partnerId"], alice_id.to_string());

        // Carol's invitation to Bob expired when Bob paired up
        let req = TestRequest::get()
            .uri("/partner/sent-invitations")
            .insert_header(("SessionToken", carol_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let carol_sent: Vec<serde_json::Value> = test_utils::read_json(resp).await;
        assert!(carol_sent.is_empty());

        let req = TestRequest::get()
            .uri("/user")
            .insert_header(("SessionToken", alice_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let alice: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(alice["partnerId"], bob_id.to_string());

        let req = TestRequest::post()
            .uri("/partner/remove")
            .insert_header(("SessionToken", bob_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/partner/remove")
            .insert_header(("SessionToken", alice_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
