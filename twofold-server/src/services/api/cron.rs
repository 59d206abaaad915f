use actix_web::web::*;

use crate::handlers::cron;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/cron").service(
            resource("/recurring-transactions")
                .route(post().to(cron::materialize_recurring_transactions)),
        ),
    );
}
