//! Configuration module for the Biblioperson backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::AppError;

/// Default upload ceiling in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// Default number of words per reconstructed page.
pub const DEFAULT_WORDS_PER_PAGE: usize = 300;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Directory where uploaded files are stored
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
    /// Words per reconstructed ebook page
    pub words_per_page: usize,
    /// Run segmentation in the background right after an upload
    pub process_on_upload: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("BIBLIO_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("BIBLIO_DB_PATH")
            .unwrap_or_else(|_| "./data/library.sqlite".to_string())
            .into();

        let index_path = env::var("BIBLIO_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let upload_dir = env::var("BIBLIO_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr: SocketAddr = parse_var("BIBLIO_BIND_ADDR", "127.0.0.1:8080".parse().ok())?;
        let log_level = env::var("BIBLIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = parse_var("BIBLIO_LOG_JSON", Some(false))?;
        let max_upload_mb: u64 = parse_var("BIBLIO_MAX_UPLOAD_MB", Some(DEFAULT_MAX_UPLOAD_MB))?;
        let max_upload_bytes = megabytes(max_upload_mb).ok_or_else(|| {
            AppError::Internal(format!("Invalid BIBLIO_MAX_UPLOAD_MB value: {}", max_upload_mb))
        })?;
        let words_per_page = parse_var("BIBLIO_WORDS_PER_PAGE", Some(DEFAULT_WORDS_PER_PAGE))?;
        let process_on_upload = parse_var("BIBLIO_PROCESS_ON_UPLOAD", Some(true))?;

        if words_per_page == 0 {
            return Err(AppError::Internal(
                "BIBLIO_WORDS_PER_PAGE must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_psk,
            db_path,
            index_path,
            upload_dir,
            bind_addr,
            log_level,
            log_json,
            max_upload_bytes,
            words_per_page,
            process_on_upload,
        })
    }
}

fn megabytes(mb: u64) -> Option<u64> {
    mb.checked_mul(1024 * 1024)
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &str, default: Option<T>) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Internal(format!("Invalid {} value: {:?}", name, raw))),
        Err(_) => default.ok_or_else(|| AppError::Internal(format!("{} is required", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for var in [
            "BIBLIO_API_PSK",
            "BIBLIO_DB_PATH",
            "BIBLIO_INDEX_PATH",
            "BIBLIO_UPLOAD_DIR",
            "BIBLIO_BIND_ADDR",
            "BIBLIO_LOG_LEVEL",
            "BIBLIO_LOG_JSON",
            "BIBLIO_MAX_UPLOAD_MB",
            "BIBLIO_WORDS_PER_PAGE",
            "BIBLIO_PROCESS_ON_UPLOAD",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/library.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.upload_dir, PathBuf::from("./data/uploads"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.words_per_page, 300);
        assert!(config.process_on_upload);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("BIBLIO_TEST_PARSE_NUMBER", "forty");
        let parsed: Result<u64, _> = parse_var("BIBLIO_TEST_PARSE_NUMBER", Some(1));
        assert!(parsed.is_err());
        env::remove_var("BIBLIO_TEST_PARSE_NUMBER");

        let fallback: u64 = parse_var("BIBLIO_TEST_PARSE_UNSET", Some(7)).unwrap();
        assert_eq!(fallback, 7);
    }

    #[test]
    fn test_upload_limit_overflow_is_rejected() {
        assert_eq!(megabytes(50), Some(50 * 1024 * 1024));
        assert!(megabytes(u64::MAX / (1024 * 1024)).is_some());
        assert!(megabytes(u64::MAX / 1024).is_none());
        assert!(megabytes(u64::MAX).is_none());
    }
}
