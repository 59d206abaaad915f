use actix_web::web::*;

use crate::handlers::dashboard;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(resource("/dashboard").route(get().to(dashboard::get)));
}
