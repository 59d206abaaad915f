use actix_web::web::*;

use crate::handlers::list;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/lists")
            .service(
                resource("")
                    .route(get().to(list::get_all))
                    .route(post().to(list::create)),
            )
            .service(
                resource("/{list_id}")
                    .route(get().to(list::get))
                    .route(put().to(list::edit))
                    .route(delete().to(list::delete)),
            )
            .service(resource("/{list_id}/items").route(post().to(list::add_item)))
            .service(
                resource("/{list_id}/items/{item_id}")
                    .route(put().to(list::edit_item))
                    .route(delete().to(list::delete_item)),
            )
            .service(
                resource("/{list_id}/items/{item_id}/check").route(post().to(list::check_item)),
            ),
    );
}
