use actix_web::web::*;

use crate::handlers::user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        resource("/user")
            .route(get().to(user::get))
            .route(put().to(user::edit)),
    );
}
