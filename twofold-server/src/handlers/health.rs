use twofold_common::db::DbAsyncPool;
use twofold_common::request_io::inputs::InputHealthEndpointKey;

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::env;
use crate::middleware::secrets_match;

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    db_async_pool: web::Data<DbAsyncPool>,
    query: Option<web::Query<InputHealthEndpointKey>>,
) -> impl Responder {
    let Some(query) = query else {
        return HttpResponse::Unauthorized().finish();
    };

    if !secrets_match(
        query.key.as_bytes(),
        env::CONF.health_endpoint_key.as_bytes(),
    ) {
        return HttpResponse::Unauthorized().finish();
    }

    let async_pool_state = db_async_pool.state();
    let resp_body = json!({
        "db_async_pool_state": {
            "connections": async_pool_state.connections,
            "idle_connections": async_pool_state.idle_connections
        }
    });

    HttpResponse::Ok().json(resp_body)
}
