use twofold_common::db::{self, DbAsyncPool};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::cron_secret::CronSecret;

/// Materializes this month's recurring transactions. A no-op on any day but the first of the
/// month, so the scheduler calling it daily is fine.
pub async fn materialize_recurring_transactions(
    db_async_pool: web::Data<DbAsyncPool>,
    _cron_secret: CronSecret,
) -> Result<HttpResponse, HttpErrorResponse> {
    let today = Utc::now().date_naive();

    let recurring_dao = db::recurring::Dao::new(&db_async_pool);
    let report = match recurring_dao.materialize(today).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to materialize recurring transactions",
            )));
        }
    };

    log::info!(
        "Materialized recurring transactions for {today}: {} created, {} annual updated, {} skipped",
        report.created_count,
        report.annual_updated_count,
        report.skipped_count,
    );

    Ok(HttpResponse::Ok().json(report))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;

    use crate::env;

    #[actix_web::test]
    async fn test_requires_cron_secret() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/cron/recurring-transactions")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/cron/recurring-transactions")
            .insert_header(("Authorization", "Bearer not-the-secret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    #[ignore]
    async fn test_materialize_reports_counts() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/cron/recurring-transactions")
            .insert_header((
                "Authorization",
                format!("Bearer {}", env::CONF.cron_secret).as_str(),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = crate::handlers::test_utils::read_json(resp).await;
        assert!(body["createdCount"].is_u64());
        assert!(body["annualUpdatedCount"].is_u64());
        assert!(body["skippedCount"].is_u64());
    }
}
