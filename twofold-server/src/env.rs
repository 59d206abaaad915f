use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

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

const HASHING_KEY_VAR: &str = "TWOFOLD_HASHING_KEY_B64";
const SESSION_SIGNING_KEY_VAR: &str = "TWOFOLD_SESSION_SIGNING_KEY_B64";
const CRON_SECRET_VAR: &str = "TWOFOLD_CRON_SECRET";
const HEALTH_ENDPOINT_KEY_VAR: &str = "TWOFOLD_HEALTH_ENDPOINT_KEY";

const HASH_LENGTH_VAR: &str = "TWOFOLD_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "TWOFOLD_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "TWOFOLD_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "TWOFOLD_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "TWOFOLD_HASH_SALT_LENGTH";

const SESSION_LIFETIME_DAYS_VAR: &str = "TWOFOLD_SESSION_LIFETIME_DAYS";

const ACTIX_WORKER_COUNT_VAR: &str = "TWOFOLD_ACTIX_WORKER_COUNT";
const SERVER_PORT_VAR: &str = "TWOFOLD_SERVER_PORT";

const LOG_LEVEL_VAR: &str = "TWOFOLD_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const SESSION_SIGNING_KEY_SIZE: usize = 64;

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

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub session_signing_key: [u8; SESSION_SIGNING_KEY_SIZE],
    pub cron_secret: String,
    pub health_endpoint_key: String,

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub session_lifetime: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub server_port: u16,

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
        let hashing_key = decode_key::<HASHING_KEY_SIZE>(HASHING_KEY_VAR)?;
        let session_signing_key = decode_key::<SESSION_SIGNING_KEY_SIZE>(SESSION_SIGNING_KEY_VAR)?;

        let cron_secret: String = env_var(CRON_SECRET_VAR)?;
        if cron_secret.is_empty() {
            return Err(ConfigError::invalid(CRON_SECRET_VAR));
        }

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            session_signing_key,
            cron_secret,
            health_endpoint_key: env_var(HEALTH_ENDPOINT_KEY_VAR)?,

            hash_length: env_var(HASH_LENGTH_VAR)?,
            hash_iterations: env_var(HASH_ITERATIONS_VAR)?,
            hash_mem_cost_kib: env_var(HASH_MEM_COST_KIB_VAR)?,
            hash_threads: env_var(HASH_THREADS_VAR)?,
            hash_salt_length: env_var(HASH_SALT_LENGTH_VAR)?,

            session_lifetime: Duration::from_secs(
                env_var_or(SESSION_LIFETIME_DAYS_VAR, 30) * 86400,
            ),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            server_port: env_var_or(SERVER_PORT_VAR, 9000),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

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

fn decode_key<const N: usize>(key: &'static str) -> Result<[u8; N], ConfigError> {
    let decoded = Zeroizing::new(
        b64.decode(env_var::<String>(key)?.as_bytes())
            .map_err(|_| ConfigError::invalid(key))?,
    );

    if decoded.len() < N {
        return Err(ConfigError::invalid(key));
    }

    decoded[..N]
        .try_into()
        .map_err(|_| ConfigError::invalid(key))
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use diesel_async::pooled_connection::bb8::Pool;
    use diesel_async::pooled_connection::AsyncDieselConnectionManager;
    use diesel_async::AsyncPgConnection;
    use twofold_common::db::DbAsyncPool;

    use super::*;

    /// Used when the environment does not provide a configuration. Handlers that touch the
    /// database still need the `TWOFOLD_DB_*` variables.
    pub fn default_config() -> Config {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::from("postgres")),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("twofold")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 8),
            db_idle_timeout: Duration::from_secs(30),

            hashing_key: [7; HASHING_KEY_SIZE],
            session_signing_key: [11; SESSION_SIGNING_KEY_SIZE],
            cron_secret: String::from("test-cron-secret"),
            health_endpoint_key: String::from("test-health-key"),

            hash_length: 32,
            hash_iterations: 1,
            hash_mem_cost_kib: 1024,
            hash_threads: 1,
            hash_salt_length: 16,

            session_lifetime: Duration::from_secs(3600),

            actix_worker_count: 1,
            server_port: 9000,

            log_level: String::from("info"),
        };

        Config {
            inner: UnsafeCell::new(inner),
        }
    }

    /// A fresh pool per call so that each test's runtime owns its connections. Connections are
    /// opened lazily, on first checkout.
    pub fn db_async_pool() -> DbAsyncPool {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(CONF.database_uri());
        Pool::builder()
            .max_size(CONF.db_max_connections)
            .build_unchecked(manager)
    }
}
