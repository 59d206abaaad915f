use actix_web::web::*;

use crate::handlers::transaction;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/transactions")
            .service(
                resource("")
                    .route(get().to(transaction::get))
                    .route(post().to(transaction::create)),
            )
            .service(
                resource("/{transaction_id}")
                    .route(put().to(transaction::edit))
                    .route(delete().to(transaction::delete)),
            ),
    );
}
