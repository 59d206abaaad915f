use twofold_common::categories::CategoryIndex;
use twofold_common::db::transaction::TransactionFields;
use twofold_common::db::{self, DbAsyncPool};
use twofold_common::models::transaction::Transaction;
use twofold_common::request_io::inputs::{InputTransaction, InputTransactionQuery};
use twofold_common::request_io::outputs::OutputTransaction;

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::dashboard::resolve_month;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn get(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    query: web::Query<InputTransactionQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let transaction_dao = db::transaction::Dao::new(&db_async_pool);

    let loaded = if query.annual.unwrap_or(false) {
        transaction_dao.get_annual_transactions(user_id).await
    } else {
        let (year, month0) = resolve_month(query.month, query.year)?;
        transaction_dao
            .get_transactions_for_month(user_id, year, month0)
            .await
    };

    let transactions = match loaded {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get transactions",
            )));
        }
    };

    let category_index = load_category_index(&db_async_pool, user_id).await?;

    let output: Vec<OutputTransaction> = transactions
        .into_iter()
        .map(|t| OutputTransaction::for_viewer(t, user_id, &category_index))
        .collect();

    Ok(HttpResponse::Ok().json(output))
}

pub async fn create(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let valid = transaction_data.validate()?;

    let owner_id = transaction_data.user_id.unwrap_or(user_id);
    if owner_id != user_id {
        let partner_dao = db::partner::Dao::new(&db_async_pool);
        match partner_dao.get_partner_id(user_id).await {
            Ok(Some(partner_id)) if partner_id == owner_id => (),
            Ok(_) => {
                return Err(HttpErrorResponse::UserDisallowed(Cow::Borrowed(
                    "Transactions can only be recorded for yourself or your partner",
                )));
            }
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                    "Failed to get partner",
                )));
            }
        }
    }

    ensure_category_usable(&db_async_pool, user_id, transaction_data.category_id).await?;

    let fields = TransactionFields {
        category_id: transaction_data.category_id,
        description: transaction_data.description.trim(),
        amount_cents: valid.amount_cents,
        date: transaction_data.date,
        is_fixed: valid.is_fixed,
        repeat_type: transaction_data.repeat_type,
        end_date: valid.end_date,
        is_private: transaction_data.is_private,
    };

    let transaction_dao = db::transaction::Dao::new(&db_async_pool);
    let transaction = match transaction_dao
        .create_transaction(owner_id, user_id, &fields)
        .await
    {
        Ok(t) => t,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to create transaction",
            )));
        }
    };

    let category_index = load_category_index(&db_async_pool, user_id).await?;

    Ok(HttpResponse::Created().json(OutputTransaction::for_viewer(
        transaction,
        user_id,
        &category_index,
    )))
}

pub async fn edit(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    transaction_id: web::Path<Uuid>,
    transaction_data: web::Json<InputTransaction>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let transaction_id = transaction_id.into_inner();
    let valid = transaction_data.validate()?;

    ensure_recorded_by(&db_async_pool, user_id, transaction_id).await?;
    ensure_category_usable(&db_async_pool, user_id, transaction_data.category_id).await?;

    let fields = TransactionFields {
        category_id: transaction_data.category_id,
        description: transaction_data.description.trim(),
        amount_cents: valid.amount_cents,
        date: transaction_data.date,
        is_fixed: valid.is_fixed,
        repeat_type: transaction_data.repeat_type,
        end_date: valid.end_date,
        is_private: transaction_data.is_private,
    };

    let transaction_dao = db::transaction::Dao::new(&db_async_pool);
    let transaction = match transaction_dao
        .update_transaction(transaction_id, user_id, &fields)
        .await
    {
        Ok(t) => t,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Transaction not found"),
                DoesNotExistType::Transaction,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to update transaction",
            )));
        }
    };

    let category_index = load_category_index(&db_async_pool, user_id).await?;

    Ok(HttpResponse::Ok().json(OutputTransaction::for_viewer(
        transaction,
        user_id,
        &category_index,
    )))
}

pub async fn delete(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let transaction_id = transaction_id.into_inner();

    ensure_recorded_by(&db_async_pool, user_id, transaction_id).await?;

    let transaction_dao = db::transaction::Dao::new(&db_async_pool);
    match transaction_dao
        .delete_transaction(transaction_id, user_id)
        .await
    {
        Ok(_) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Transaction not found"),
                DoesNotExistType::Transaction,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to delete transaction",
            )));
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

pub(crate) async fn load_category_index(
    db_async_pool: &DbAsyncPool,
    user_id: Uuid,
) -> Result<CategoryIndex, HttpErrorResponse> {
    let category_dao = db::category::Dao::new(db_async_pool);
    match category_dao.get_category_index(user_id).await {
        Ok(i) => Ok(i),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get categories",
            )))
        }
    }
}

async fn ensure_recorded_by(
    db_async_pool: &DbAsyncPool,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, HttpErrorResponse> {
    let transaction_dao = db::transaction::Dao::new(db_async_pool);
    let transaction = match transaction_dao
        .get_visible_transaction(user_id, transaction_id)
        .await
    {
        Ok(Some(t)) => t,
        Ok(None) => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Transaction not found"),
                DoesNotExistType::Transaction,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get transaction",
            )));
        }
    };

    if transaction.created_by != user_id {
        return Err(HttpErrorResponse::UserDisallowed(Cow::Borrowed(
            "Only the user who recorded a transaction can change it",
        )));
    }

    Ok(transaction)
}

pub(crate) async fn ensure_category_usable(
    db_async_pool: &DbAsyncPool,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<(), HttpErrorResponse> {
    let category_dao = db::category::Dao::new(db_async_pool);
    match category_dao.is_category_usable(user_id, category_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(HttpErrorResponse::invalid_field(
            "categoryId",
            "Category does not exist.",
        )),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get category",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;
    use twofold_common::categories::{OTHER_EXPENSE_CATEGORY_ID, OTHER_INCOME_CATEGORY_ID};

    use crate::env;
    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_create_validation() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let token = test_utils::session_token_for(Uuid::now_v7(), "nobody@example.com");

        let req = TestRequest::post()
            .uri("/transactions")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({
                "categoryId": OTHER_EXPENSE_CATEGORY_ID,
                "description": "Rent",
                "amount": -3.0,
                "date": "2024-05-10",
                "repeatType": "until",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test_utils::read_json(resp).await;
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"amount"));
        assert!(fields.contains(&"endDate"));
    }

    #[actix_web::test]
    async fn test_get_rejects_out_of_range_month() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let token = test_utils::session_token_for(Uuid::now_v7(), "nobody@example.com");

        let req = TestRequest::get()
            .uri("/transactions?month=12&year=2024")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    #[ignore]
    async fn test_transactions_for_month() {
        let (user_id, token) = test_utils::create_user().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        for (category_id, description, amount, date, repeat_type) in [
            (OTHER_INCOME_CATEGORY_ID, "Salary", 2000.0, "2024-05-01", "once"),
            (OTHER_EXPENSE_CATEGORY_ID, "Groceries", 45.5, "2024-05-03", "once"),
            (OTHER_EXPENSE_CATEGORY_ID, "Car insurance", 300.0, "2022-05-20", "annual"),
            (OTHER_EXPENSE_CATEGORY_ID, "Too early", 10.0, "2024-04-30", "once"),
        ] {
            let req = TestRequest::post()
                .uri("/transactions")
                .insert_header(("SessionToken", token.as_str()))
                .set_json(json!({
                    "categoryId": category_id,
                    "description": description,
                    "amount": amount,
                    "date": date,
                    "repeatType": repeat_type,
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = TestRequest::get()
            .uri("/transactions?month=4&year=2024")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Vec<serde_json::Value> = test_utils::read_json(resp).await;
        assert_eq!(body.len(), 3);
        assert!(body.iter().all(|t| t["userId"] == user_id.to_string()));
        assert!(body.iter().all(|t| t["description"] != "Too early"));
        assert!(body
            .iter()
            .all(|t| t["category"]["id"] == t["categoryId"] && !t["category"]["name"].is_null()));

        let req = TestRequest::get()
            .uri("/transactions?annual=true")
            .insert_header(("SessionToken", token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Vec<serde_json::Value> = test_utils::read_json(resp).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["description"], "Car insurance");
    }

    #[actix_web::test]
    #[ignore]
    async fn test_only_recorder_can_edit() {
        let (_, token) = test_utils::create_user().await;
        let (stranger_id, stranger_token) = test_utils::create_user().await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(env::testing::db_async_pool()))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/transactions")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({
                "userId": stranger_id,
                "categoryId": OTHER_EXPENSE_CATEGORY_ID,
                "description": "Not theirs",
                "amount": 5,
                "date": "2024-05-10",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/transactions")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({
                "categoryId": Uuid::now_v7(),
                "description": "Unknown category",
                "amount": 5,
                "date": "2024-05-10",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/transactions")
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({
                "categoryId": OTHER_EXPENSE_CATEGORY_ID,
                "description": "Coffee",
                "amount": 3.2,
                "date": "2024-05-10",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let created: serde_json::Value = test_utils::read_json(resp).await;
        let uri = format!("/transactions/{}", created["id"].as_str().unwrap());

        let req = TestRequest::delete()
            .uri(&uri)
            .insert_header(("SessionToken", stranger_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::put()
            .uri(&uri)
            .insert_header(("SessionToken", token.as_str()))
            .set_json(json!({
                "categoryId": OTHER_EXPENSE_CATEGORY_ID,
                "description": "Coffee and cake",
                "amount": 7.8,
                "date": "2024-05-10",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let updated: serde_json::Value = test_utils::read_json(resp).await;
        assert_eq!(updated["description"], "Coffee and cake");
        assert_eq!(updated["amount"], 7.8);
    }
}
