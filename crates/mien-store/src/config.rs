use std::path::PathBuf;
use std::time::Duration;

use mien_core::matcher::DEFAULT_TOLERANCE;

use crate::cache::DEFAULT_REFRESH_PERIOD;

/// Runtime configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Period between known-face refresh cycles.
    pub refresh_period: Duration,
    /// Match tolerance (maximum embedding distance).
    pub tolerance: f32,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("mien");

        let db_path = std::env::var("MIEN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("faces.db"));

        Self {
            db_path,
            refresh_period: Duration::from_secs(env_u64(
                "MIEN_REFRESH_SECS",
                DEFAULT_REFRESH_PERIOD.as_secs(),
            )),
            tolerance: env_f32("MIEN_TOLERANCE", DEFAULT_TOLERANCE),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
