use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| {
    #[cfg(test)]
    {
        Config::from_env().unwrap_or_else(|_| testing::default_config())
    }

    #[cfg(not(test))]
    {
        Config::from_env().expect("Failed to load config")
    }
});

const DB_USERNAME_VAR: &str = "TWOFOLD_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "TWOFOLD_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "TWOFOLD_DB_HOSTNAME";
const DB_PORT_VAR: &str = "TWOFOLD_DB_PORT";
const DB_NAME_VAR: &str = "TWOFOLD_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "TWOFOLD_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "TWOFOLD_DB_IDLE_TIMEOUT_SECS";

const RUNNER_UPDATE_FREQUENCY_SECS_VAR: &str = "TWOFOLD_RUNNER_UPDATE_FREQUENCY_SECS";
const WORKER_THREADS_VAR: &str = "TWOFOLD_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "TWOFOLD_MAX_BLOCKING_THREADS";

const MATERIALIZE_RECURRING_JOB_FREQUENCY_SECS_VAR: &str =
    "TWOFOLD_MATERIALIZE_RECURRING_JOB_FREQUENCY_SECS";

const LOG_LEVEL_VAR: &str = "TWOFOLD_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    #[zeroize(skip)]
    pub update_frequency: Duration,
    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,

    #[zeroize(skip)]
    pub materialize_recurring_job_frequency: Duration,

    #[zeroize(skip)]
    pub log_level: String,
}

impl ConfigInner {
    pub fn database_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let cpu_count = num_cpus::get();

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 4),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            update_frequency: Duration::from_secs(env_var_or(
                RUNNER_UPDATE_FREQUENCY_SECS_VAR,
                60,
            )),
            worker_threads: env_var_or(WORKER_THREADS_VAR, cpu_count),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, cpu_count * 4),

            materialize_recurring_job_frequency: Duration::from_secs(env_var_or(
                MATERIALIZE_RECURRING_JOB_FREQUENCY_SECS_VAR,
                3600,
            )),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        if inner.update_frequency.is_zero() {
            return Err(ConfigError::invalid(RUNNER_UPDATE_FREQUENCY_SECS_VAR));
        }

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let value = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    value.parse().map_err(|_| ConfigError::invalid(key))
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl ConfigError {
    fn missing(key: &'static str) -> Self {
        ConfigError::Missing(key)
    }

    fn invalid(key: &'static str) -> Self {
        ConfigError::Invalid(key)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing environment variable '{key}'"),
            ConfigError::Invalid(key) => write!(f, "Invalid value for environment variable '{key}'"),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    pub fn default_config() -> Config {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::from("postgres")),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("twofold")),
            db_max_connections: 2,
            db_idle_timeout: Duration::from_secs(30),

            update_frequency: Duration::from_secs(1),
            worker_threads: 1,
            max_blocking_threads: 1,

            materialize_recurring_job_frequency: Duration::from_secs(3600),

            log_level: String::from("info"),
        };

        Config {
            inner: UnsafeCell::new(inner),
        }
    }
}
