use serde::Deserialize;
use std::time::Duration;

use crate::db::PoolSettings;
use crate::services::validation::UploadRules;
use crate::services::worker::WorkerConfig;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string. Without it, metadata lives in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Gemini API key
    pub gemini_api_key: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Pause between enrichment jobs, in milliseconds
    #[serde(default = "default_inter_job_delay_ms")]
    pub inter_job_delay_ms: u64,

    /// Analysis attempts per job (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Optional timeout for a single analysis call
    #[serde(default)]
    pub analysis_timeout_secs: Option<u64>,

    /// Per-file upload limit in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,

    /// Accepted upload mime types (comma-separated in the environment)
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_db_max_connections() -> u32 {
    PoolSettings::default().max_connections
}

fn default_db_min_connections() -> u32 {
    PoolSettings::default().min_connections
}

fn default_db_acquire_timeout_secs() -> u64 {
    PoolSettings::default().acquire_timeout.as_secs()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_inter_job_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    1
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_files_per_upload() -> usize {
    10
}

fn default_allowed_formats() -> Vec<String> {
    vec!["image/jpeg".to_string(), "image/png".to_string()]
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            inter_job_delay: Duration::from_millis(self.inter_job_delay_ms),
            max_attempts: self.max_attempts,
            per_call_timeout: self.analysis_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }

    pub fn upload_rules(&self) -> UploadRules {
        UploadRules {
            max_file_size: self.max_file_size,
            max_files_per_upload: self.max_files_per_upload,
            allowed_formats: self.allowed_formats.clone(),
        }
    }

    /// Whole-request body limit for multipart uploads.
    pub fn request_body_limit(&self) -> usize {
        self.max_file_size
            .saturating_mul(self.max_files_per_upload)
            .saturating_add(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_preserve_single_attempt_no_timeout() {
        let config = AppConfig::from_vars(vars(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.database_url.is_none());
        assert_eq!(config.allowed_formats, vec!["image/jpeg", "image/png"]);
        assert_eq!(config.pool_settings(), PoolSettings::default());

        let worker = config.worker_config();
        assert_eq!(worker.inter_job_delay, Duration::from_secs(1));
        assert_eq!(worker.max_attempts, 1);
        assert!(worker.per_call_timeout.is_none());
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = AppConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", "k"),
            ("INTER_JOB_DELAY_MS", "250"),
            ("MAX_ATTEMPTS", "3"),
            ("ANALYSIS_TIMEOUT_SECS", "45"),
            ("ALLOWED_FORMATS", "image/png"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();

        let worker = config.worker_config();
        assert_eq!(worker.inter_job_delay, Duration::from_millis(250));
        assert_eq!(worker.max_attempts, 3);
        assert_eq!(worker.per_call_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.upload_rules().allowed_formats, vec!["image/png"]);

        let pool = config.pool_settings();
        assert_eq!(pool.max_connections, 4);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(pool.acquire_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(AppConfig::from_vars(Vec::new()).is_err());
    }
}
