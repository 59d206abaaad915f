use twofold_common::db::{create_db_async_pool, job_registry};

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use runner::JobRunner;
use zeroize::Zeroizing;

mod env;
mod jobs;
mod runner;

use jobs::MaterializeRecurringTransactionsJob;

fn main() {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.log_level)
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

            let db_async_pool = create_db_async_pool(
                &Zeroizing::new(env::CONF.database_uri()),
                env::CONF.db_max_connections,
                env::CONF.db_idle_timeout,
            )
            .await;

            let mut job_runner = JobRunner::new(
                env::CONF.update_frequency,
                job_registry::Dao::new(&db_async_pool),
            );

            job_runner
                .register(
                    Box::new(MaterializeRecurringTransactionsJob::new(
                        db_async_pool.clone(),
                    )),
                    env::CONF.materialize_recurring_job_frequency,
                )
                .await;

            job_runner.start().await;
        });

    unsafe {
        env::CONF.zeroize();
    }
}
