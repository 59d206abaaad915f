use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::web::*;
use actix_web::HttpRequest;
use std::borrow::Cow;

use crate::handlers::error::HttpErrorResponse;

mod auth;
mod category;
mod cron;
mod dashboard;
mod health;
mod list;
mod partner;
mod transaction;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(json_error_handler))
        .app_data(QueryConfig::default().error_handler(query_error_handler))
        .app_data(PathConfig::default().error_handler(path_error_handler))
        .configure(auth::configure)
        .configure(user::configure)
        .configure(category::configure)
        .configure(transaction::configure)
        .configure(dashboard::configure)
        .configure(list::configure)
        .configure(partner::configure)
        .configure(cron::configure)
        .configure(health::configure);
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
}

fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
}
