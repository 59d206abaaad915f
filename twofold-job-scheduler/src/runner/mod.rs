use twofold_common::db::job_registry::Dao as JobRegistryDao;
use twofold_common::db::DaoError;

use async_trait::async_trait;
use futures::future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

/// Where the runner keeps each job's last run time, so restarts don't rerun every job at once.
#[async_trait]
pub trait RunRegistry: Send + Sync {
    async fn last_run(&self, job_name: &'static str) -> Result<Option<SystemTime>, DaoError>;
    async fn record_run(&self, job_name: &'static str, time: SystemTime) -> Result<(), DaoError>;
}

#[async_trait]
impl RunRegistry for JobRegistryDao {
    async fn last_run(&self, job_name: &'static str) -> Result<Option<SystemTime>, DaoError> {
        self.get_job_last_run_timestamp(job_name).await
    }

    async fn record_run(&self, job_name: &'static str, time: SystemTime) -> Result<(), DaoError> {
        self.set_job_last_run_timestamp(job_name, time).await
    }
}

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner<R: RunRegistry> {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    registry: R,
}

impl<R: RunRegistry> JobRunner<R> {
    pub fn new(update_frequency: Duration, registry: R) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            registry,
        }
    }

    /// A job that has never run is first run one `run_frequency` after registration.
    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name,
            run_frequency.as_secs()
        );

        let last_run_time = self
            .registry
            .last_run(job_name)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to get last run timestamp for job '{job_name}': {e}");
                None
            });

        self.jobs.push(JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or(SystemTime::now()),
        });
    }

    /// Runs every job that is due, concurrently, and records the run. Returns how many ran.
    pub async fn run_due_jobs(&mut self, now: SystemTime) -> usize {
        let mut job_names = Vec::with_capacity(self.jobs.len());
        let mut job_futures = Vec::with_capacity(self.jobs.len());

        for job_container in &mut self.jobs {
            let time_elapsed_since_last_run = now
                .duration_since(job_container.last_run_time)
                .unwrap_or(Duration::ZERO);
            let is_time_to_run = time_elapsed_since_last_run >= job_container.run_frequency;

            if is_time_to_run && job_container.job.is_ready() {
                let name = job_container.job.name();
                log::info!("Executing job \"{name}\"");

                job_container.last_run_time = now;
                job_names.push(name);
                job_futures.push(job_container.job.execute());
            }
        }

        let job_results = future::join_all(job_futures).await;

        for (name, result) in job_names.iter().zip(job_results) {
            match result {
                Ok(_) => log::info!("Job \"{name}\" finished successfully"),
                Err(e) => log::error!("Job \"{name}\" failed: {e}"),
            }

            if let Err(e) = self.registry.record_run(name, now).await {
                log::error!("Error recording run of job \"{name}\": {e}");
            }
        }

        job_names.len()
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            self.run_due_jobs(SystemTime::now()).await;

            let delta = before.elapsed();
            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }
}
