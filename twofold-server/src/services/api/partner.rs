use actix_web::web::*;

use crate::handlers::partner;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/partner")
            .service(resource("/invite").route(post().to(partner::invite)))
            .service(resource("/accept").route(post().to(partner::accept)))
            .service(resource("/decline").route(post().to(partner::decline)))
            .service(resource("/cancel").route(post().to(partner::cancel)))
            .service(resource("/remove").route(post().to(partner::remove)))
            .service(resource("/info").route(get().to(partner::info)))
            .service(resource("/search").route(get().to(partner::search)))
            .service(resource("/sent-invitations").route(get().to(partner::sent_invitations))),
    );
}
