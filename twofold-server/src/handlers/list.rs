use twofold_common::categories::OTHER_EXPENSE_CATEGORY_ID;
use twofold_common::db::list::ListItemFields;
use twofold_common::db::{self, DbAsyncPool};
use twofold_common::models::list::List;
use twofold_common::models::list_item::ListItem;
use twofold_common::request_io::inputs::{InputCheck, InputList, InputListItem};
use twofold_common::request_io::outputs::{OutputList, OutputListItem};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::handlers::transaction::ensure_category_usable;
use crate::middleware::auth::VerifiedToken;
use crate::middleware::FromHeaderOrCookie;

pub async fn get_all(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let list_dao = db::list::Dao::new(&db_async_pool);
    let lists = match list_dao
        .get_visible_lists(user_access_token.claims.user_id)
        .await
    {
        Ok(l) => l,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get lists",
            )));
        }
    };

    let output: Vec<OutputList> = lists
        .into_iter()
        .map(|(list, items)| OutputList::new(list, items))
        .collect();

    Ok(HttpResponse::Ok().json(output))
}

pub async fn create(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    list_data: web::Json<InputList>,
) -> Result<HttpResponse, HttpErrorResponse> {
    list_data.validate()?;

    let list_dao = db::list::Dao::new(&db_async_pool);
    let list = match list_dao
        .create_list(
            user_access_token.claims.user_id,
            list_data.title.trim(),
            &list_data.color,
            list_data.is_shared,
        )
        .await
    {
        Ok(l) => l,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to create list",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputList::new(list, Vec::new())))
}

pub async fn get(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    list_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let (list, items) = load_visible_list(
        &db_async_pool,
        user_access_token.claims.user_id,
        list_id.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(OutputList::new(list, items)))
}

pub async fn edit(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    list_id: web::Path<Uuid>,
    list_data: web::Json<InputList>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let list_id = list_id.into_inner();

    list_data.validate()?;

    let (list, items) = load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_list_owner(&list, user_id)?;

    let list_dao = db::list::Dao::new(&db_async_pool);
    let list = match list_dao
        .update_list(
            list_id,
            user_id,
            list_data.title.trim(),
            &list_data.color,
            list_data.is_shared,
        )
        .await
    {
        Ok(l) => l,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("List not found"),
                DoesNotExistType::List,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to update list",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputList::new(list, items)))
}

pub async fn delete(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    list_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let list_id = list_id.into_inner();

    let (list, _) = load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_list_owner(&list, user_id)?;

    let list_dao = db::list::Dao::new(&db_async_pool);
    match list_dao.delete_list(list_id, user_id).await {
        Ok(_) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("List not found"),
                DoesNotExistType::List,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to delete list",
            )));
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

pub async fn add_item(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    list_id: web::Path<Uuid>,
    item_data: web::Json<InputListItem>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let list_id = list_id.into_inner();

    let prices = item_data.validate()?;
    let category_id = item_data.category_id.unwrap_or(OTHER_EXPENSE_CATEGORY_ID);

    load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_category_usable(&db_async_pool, user_id, category_id).await?;

    let fields = ListItemFields {
        name: item_data.name.trim(),
        estimated_price_cents: prices.estimated_price_cents,
        actual_price_cents: prices.actual_price_cents,
        category_id,
    };

    let list_dao = db::list::Dao::new(&db_async_pool);
    let item = match list_dao.add_item(list_id, user_id, &fields).await {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to add list item",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputListItem::from(item)))
}

pub async fn edit_item(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    ids: web::Path<(Uuid, Uuid)>,
    item_data: web::Json<InputListItem>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let (list_id, item_id) = ids.into_inner();

    let prices = item_data.validate()?;
    let category_id = item_data.category_id.unwrap_or(OTHER_EXPENSE_CATEGORY_ID);

    let (_, items) = load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_item_in_list(&items, item_id)?;
    ensure_category_usable(&db_async_pool, user_id, category_id).await?;

    let fields = ListItemFields {
        name: item_data.name.trim(),
        estimated_price_cents: prices.estimated_price_cents,
        actual_price_cents: prices.actual_price_cents,
        category_id,
    };

    let list_dao = db::list::Dao::new(&db_async_pool);
    let item = match list_dao.update_item(list_id, item_id, &fields).await {
        Ok(i) => i,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("List item not found"),
                DoesNotExistType::ListItem,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to update list item",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputListItem::from(item)))
}

pub async fn delete_item(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    ids: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let (list_id, item_id) = ids.into_inner();

    let (_, items) = load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_item_in_list(&items, item_id)?;

    let list_dao = db::list::Dao::new(&db_async_pool);
    match list_dao.delete_item(list_id, item_id).await {
        Ok(_) => (),
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("List item not found"),
                DoesNotExistType::ListItem,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to delete list item",
            )));
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Checks, unchecks or (with no body) toggles an item.
pub async fn check_item(
    db_async_pool: web::Data<DbAsyncPool>,
    user_access_token: VerifiedToken<FromHeaderOrCookie>,
    ids: web::Path<(Uuid, Uuid)>,
    check: Option<web::Json<InputCheck>>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let (list_id, item_id) = ids.into_inner();
    let checked = check.and_then(|c| c.checked);

    let (_, items) = load_visible_list(&db_async_pool, user_id, list_id).await?;
    ensure_item_in_list(&items, item_id)?;

    let list_dao = db::list::Dao::new(&db_async_pool);
    let item = match list_dao
        .set_item_checked(user_id, list_id, item_id, checked, Utc::now().date_naive())
        .await
    {
        Ok(i) => i,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("List item not found"),
                DoesNotExistType::ListItem,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to check list item",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputListItem::from(item)))
}

async fn load_visible_list(
    db_async_pool: &DbAsyncPool,
    user_id: Uuid,
    list_id: Uuid,
) -> Result<(List, Vec<ListItem>), HttpErrorResponse> {
    let list_dao = db::list::Dao::new(db_async_pool);
    match list_dao.get_visible_list(user_id, list_id).await {
        Ok(Some(l)) => Ok(l),
        Ok(None) => Err(HttpErrorResponse::DoesNotExist(
            Cow::Borrowed("List not found"),
            DoesNotExistType::List,
        )),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(Cow::Borrowed(
                "Failed to get list",
            )))
        }
    }
}

// A partner can work with the items of a shared list but not with the list itself
fn ensure_list_owner(list: &List, user_id: Uuid) -> Result<(), HttpErrorResponse> {
    if list.user_id != user_id {
        return Err(HttpErrorResponse::UserDisallowed(Cow::Borrowed(
            "Only the owner of a list can change it",
        )));
    }

    Ok(())
}

fn ensure_item_in_list(items: &[ListItem], item_id: Uuid) -> Result<(), HttpErrorResponse> {
    if !items.iter().any(|i| i.id == item_id) {
        return Err(HttpErrorResponse::DoesNotExist(
            Cow::Borrowed("List item not found"),
            DoesNotExistType::ListItem,
        ));
    }

    Ok(())
}
