use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::retry::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub busy_timeout_ms: u64,
    pub purchase_max_attempts: u32,
    pub purchase_retry_base_ms: u64,
    pub seed_sample_events: bool,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("shared-db/database.sqlite"),
            port: 8080,
            busy_timeout_ms: 1000,
            purchase_max_attempts: 3,
            purchase_retry_base_ms: 50,
            seed_sample_events: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let purchase_max_attempts: u32 = env::var("PURCHASE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);
        if purchase_max_attempts == 0 {
            anyhow::bail!("PURCHASE_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "shared-db/database.sqlite".to_string())
                .into(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            busy_timeout_ms: env::var("SQLITE_BUSY_TIMEOUT_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            purchase_max_attempts,
            purchase_retry_base_ms: env::var("PURCHASE_RETRY_BASE_MS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            seed_sample_events: env::var("SEED_SAMPLE_EVENTS")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.purchase_max_attempts,
            Duration::from_millis(self.purchase_retry_base_ms),
        )
    }
}
