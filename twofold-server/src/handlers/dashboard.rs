use twofold_common::aggregation;
use twofold_common::db::{self, DbAsyncPool};
use twofold_common::request_io::inputs::InputMonth;
use twofold_common::request_io::outputs::OutputDashboard;

use actix_web::{web, HttpResponse};
use chrono::{Datelike, Utc};
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::transaction::load_category_index;
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn get(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    query: web::Query<InputMonth>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let (year, month0) = resolve_month(query.month, query.year)?;

    let transaction_dao = db::transaction::Dao::new(&db_async_pool);
    let transactions = match transaction_dao
        .get_transactions_for_month(user_id, year, month0)
        .await
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get transactions",
            )));
        }
    };

    let category_index = load_category_index(&db_async_pool, user_id).await?;

    let summary = aggregation::summarize(&transactions, &category_index, user_id);

    Ok(HttpResponse::Ok().json(OutputDashboard {
        summary,
        month: month0,
        year,
    }))
}

/// Fills in the current UTC month for whichever of `month` (0-indexed) and `year` is missing.
pub fn resolve_month(month: Option<u32>, year: Option<i32>) -> Result<(i32, u32), HttpErrorResponse> {
    let today = Utc::now().date_naive();

    let month0 = month.unwrap_or(today.month0());
    let year = year.unwrap_or(today.year());

    if month0 > 11 {
        return Err(HttpErrorResponse::invalid_field(
            "month",
            "Month must be between 0 and 11.",
        ));
    }

    if aggregation::month_bounds(year, month0).is_none() {
        return Err(HttpErrorResponse::invalid_field("year", "Year is out of range."));
    }

    Ok((year, month0))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;
    use twofold_common::categories::{OTHER_EXPENSE_CATEGORY_ID, OTHER_INCOME_CATEGORY_ID};
    use uuid::Uuid;

    use crate::env;
    use crate::handlers::test_utils;

    #[test]
    fn test_resolve_month() {
        let today = Utc::now().date_naive();

        assert_eq!(resolve_month(Some(0), Some(2024)).unwrap(), (2024, 0));
        assert_eq!(resolve_month(Some(11), Some(1999)).unwrap(), (1999, 11));
        assert_eq!(
            resolve_month(None, None).unwrap(),
            (today.year(), today.month0())
        );
        assert_eq!(resolve_month(Some(3), None).unwrap(), (today.year(), 3));

        assert!(resolve_month(Some(12), Some(2024)).is_err());
        assert!(resolve_month(Some(0), Some(i32::MAX)).is_err());
    }

    #[actix_web::test]
    async fn test_get_requires_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::get().uri("/dashboard?month=1&year=2024").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let token = test_utils::session_token_for(Uuid::now_v7(), "nobody@example.com");
        let req = TestRequest::get()
            .uri("/dashboard?month=notanumber")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    #[ignore]
    async fn test_dashboard_totals() {
        let (_, token) = test_utils::create_user().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        for (category_id, description, amount) in [
            (OTHER_INCOME_CATEGORY_ID, "Salary", 1500.0),
            (OTHER_EXPENSE_CATEGORY_ID, "Groceries", 120.25),
            (OTHER_EXPENSE_CATEGORY_ID, "Bills (Monthly Budget)", 999.0),
            (OTHER_EXPENSE_CATEGORY_ID, "Groceries", 79.75),
        ] {
            let req = TestRequest::post()
                .uri("/transactions")
                .insert_header(("SessionToken", token.as_str()))
                .set_json(json!({
                    "categoryId": category_id,
                    "description": description,
                    "amount": amount,
                    "date": "2023-02-14",
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = TestRequest::get()
            .uri("/dashboard?month=1&year=2023")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(body["month"], 1);
        assert_eq!(body["year"], 2023);
        assert_eq!(body["balance"]["income"], 1500.0);
        assert_eq!(body["balance"]["expenses"], 200.0);
        assert_eq!(body["balance"]["balance"], 1300.0);

        let breakdown = body["categoryBreakdown"].as_array().unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0]["count"], 2);
        assert_eq!(
            breakdown[0]["category"]["id"],
            OTHER_EXPENSE_CATEGORY_ID.to_string()
        );
    }
}
