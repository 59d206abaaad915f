use actix_web::web::*;

use crate::handlers::category;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/categories")
            .service(
                resource("")
                    .route(get().to(category::get_all))
                    .route(post().to(category::create)),
            )
            .service(
                resource("/{category_id}")
                    .route(put().to(category::edit))
                    .route(delete().to(category::delete)),
            ),
    );
}
