//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.
//!
//! Services never read this singleton themselves. The binary builds a
//! [`SessionPolicy`] and a [`UniquenessPolicy`] from it once at startup and
//! passes those values down.

use crate::policy::UniquenessPolicy;
use chrono::Duration;
use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    pub qr_poll_interval_seconds: u64,
    pub qr_token_grace_seconds: u64,
    pub default_session_minutes: u32,
    pub max_session_minutes: u32,
    pub uniqueness_policy: UniquenessPolicy,
    pub session_retention_seconds: u64,
    pub housekeeping_interval_seconds: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or malformed values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "attendance-api"),
            log_level: var_or("LOG_LEVEL", "api=info,services=info"),
            log_file: var_or("LOG_FILE", "api.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/attendance.db"),
            host: var_or("HOST", "127.0.0.1"),
            port: parsed_or("PORT", 3000),
            jwt_secret: var_or("JWT_SECRET", "change-me"),
            jwt_duration_minutes: parsed_or("JWT_DURATION_MINUTES", 60),
            qr_poll_interval_seconds: parsed_or("QR_POLL_INTERVAL_SECONDS", 15),
            qr_token_grace_seconds: parsed_or("QR_TOKEN_GRACE_SECONDS", 20),
            default_session_minutes: parsed_or("DEFAULT_SESSION_MINUTES", 10),
            max_session_minutes: parsed_or("MAX_SESSION_MINUTES", 240),
            uniqueness_policy: parsed_or("ATTENDANCE_UNIQUENESS", UniquenessPolicy::PerSession),
            session_retention_seconds: parsed_or("SESSION_RETENTION_SECONDS", 60),
            housekeeping_interval_seconds: parsed_or("HOUSEKEEPING_INTERVAL_SECONDS", 60),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// A poisoned lock is recovered rather than propagated; the config is
    /// plain data and cannot be left half-written by a panicking setter.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = AppConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        setter(&mut guard);
    }

    /// The freshness and lifetime knobs of the QR session protocol.
    pub fn session_policy(&self) -> SessionPolicy {
        let defaults = SessionPolicy::default();
        SessionPolicy {
            poll_interval: seconds_or(self.qr_poll_interval_seconds, defaults.poll_interval),
            token_grace: seconds_or(self.qr_token_grace_seconds, defaults.token_grace),
            default_duration_minutes: self.default_session_minutes,
            max_duration_minutes: self.max_session_minutes,
        }
    }

    /// How long terminated sessions are kept before housekeeping deletes them.
    pub fn session_retention(&self) -> Duration {
        seconds_or(self.session_retention_seconds, Duration::seconds(60))
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_jwt_duration_minutes(value: u64) {
        AppConfig::set_field(|cfg| cfg.jwt_duration_minutes = value);
    }

    pub fn set_qr_poll_interval_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.qr_poll_interval_seconds = value);
    }

    pub fn set_qr_token_grace_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.qr_token_grace_seconds = value);
    }

    pub fn set_uniqueness_policy(value: UniquenessPolicy) {
        AppConfig::set_field(|cfg| cfg.uniqueness_policy = value);
    }
}

/// Out-of-range values fall back to `default` rather than wrapping.
fn seconds_or(value: u64, default: Duration) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(default)
}

/// Timing policy for QR attendance sessions.
///
/// `poll_interval` is what clients are told to use between rotations;
/// `token_grace` is how old a token may be and still validate. The two are
/// independent, but a grace shorter than the poll interval makes every
/// token go stale before the next rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub poll_interval: Duration,
    pub token_grace: Duration,
    pub default_duration_minutes: u32,
    pub max_duration_minutes: u32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::seconds(15),
            token_grace: Duration::seconds(20),
            default_duration_minutes: 10,
            max_duration_minutes: 240,
        }
    }
}
