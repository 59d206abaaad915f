use twofold_common::db::create_db_async_pool;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use zeroize::Zeroizing;

mod env;
mod handlers;
mod middleware;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _logger = Logger::try_with_str(&env::CONF.log_level)
        .expect(
            "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
             Example: `info, my::critical::module=trace`",
        )
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    // To prevent resource starvation, max connections must be at least as large as the number of
    // actix workers
    let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

    log::info!("Connecting to database...");

    let db_uri = Zeroizing::new(env::CONF.database_uri());
    let db_async_pool =
        create_db_async_pool(&db_uri, db_max_connections, env::CONF.db_idle_timeout).await;

    log::info!("Successfully connected to database");

    let base_addr = format!("127.0.0.1:{}", env::CONF.server_port);
    log::info!("Listening on {base_addr} with {actix_workers} workers");

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db_async_pool.clone()))
            .configure(services::api::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}
