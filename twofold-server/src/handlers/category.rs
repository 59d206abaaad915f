use twofold_common::categories::{self, is_default_category, ResolvedCategory};
use twofold_common::db::{self, DaoError, DbAsyncPool};
use twofold_common::models::category::Category;
use twofold_common::request_io::inputs::InputCategory;

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn get_all(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let category_dao = db::category::Dao::new(&db_async_pool);
    let custom = match category_dao
        .get_visible_custom_categories(user_access_token.claims.user_id)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get categories",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(categories::merge_categories(custom)))
}

pub async fn create(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    category_data: web::Json<InputCategory>,
) -> Result<HttpResponse, HttpErrorResponse> {
    category_data.validate()?;

    let category_dao = db::category::Dao::new(&db_async_pool);
    let category = match category_dao
        .create_category(
            user_access_token.claims.user_id,
            category_data.name.trim(),
            category_data.category_type,
            &category_data.color,
        )
        .await
    {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to create category",
            )));
        }
    };

    Ok(HttpResponse::Created().json(ResolvedCategory::from_custom(category)))
}

pub async fn edit(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    category_id: web::Path<Uuid>,
    category_data: web::Json<InputCategory>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let category_id = category_id.into_inner();

    category_data.validate()?;

    let category_dao = db::category::Dao::new(&db_async_pool);
    ensure_owned_custom_category(&category_dao, user_id, category_id).await?;

    let category = match category_dao
        .update_category(
            category_id,
            user_id,
            category_data.name.trim(),
            category_data.category_type,
            &category_data.color,
        )
        .await
    {
        Ok(c) => c,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Category not found"),
                DoesNotExistType::Category,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to update category",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(ResolvedCategory::from_custom(category)))
}

pub async fn delete(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let category_id = category_id.into_inner();

    let category_dao = db::category::Dao::new(&db_async_pool);
    ensure_owned_custom_category(&category_dao, user_id, category_id).await?;

    match category_dao.delete_category(category_id, user_id).await {
        Ok(_) => (),
        Err(DaoError::CannotRunQuery(msg)) => {
            return Err(HttpErrorResponse::ConflictWithExisting(Cow::Borrowed(msg)));
        }
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Category not found"),
                DoesNotExistType::Category,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to delete category",
            )));
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Built-in categories and categories the partner owns can be seen but not changed.
async fn ensure_owned_custom_category(
    category_dao: &db::category::Dao,
    user_id: Uuid,
    category_id: Uuid,
) -> Result<Category, HttpErrorResponse> {
    if is_default_category(category_id) {
        return Err(HttpErrorResponse::UserDisallowed(Cow::Borrowed(
            "Default categories cannot be changed",
        )));
    }

    let category = match category_dao
        .get_visible_custom_category(user_id, category_id)
        .await
    {
        Ok(Some(c)) => c,
        Ok(None) => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Category not found"),
                DoesNotExistType::Category,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get category",
            )));
        }
    };

    if category.user_id != user_id {
        return Err(HttpErrorResponse::UserDisallowed(Cow::Borrowed(
            "Only the owner of a category can change it",
        )));
    }

    Ok(category)
}
