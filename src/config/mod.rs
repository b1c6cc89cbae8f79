//! Configuration module for the CMS backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory the JSON snapshots are written to
    pub snapshot_dir: PathBuf,
    /// File backing the persisted site id for startup resolution (None = in memory)
    pub site_cache_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Public host this deployment answers on, used for startup domain lookup
    pub public_host: Option<String>,
    /// Successful collections required for a snapshot run to pass (None = half)
    pub snapshot_min_successes: Option<usize>,
    /// Regenerate snapshots once at startup
    pub generate_on_start: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("CMS_DB_PATH")
            .unwrap_or_else(|_| "./data/cms.sqlite".to_string())
            .into();

        let snapshot_dir = env::var("CMS_SNAPSHOT_DIR")
            .unwrap_or_else(|_| "./public/generated".to_string())
            .into();

        let site_cache_path = match env::var("CMS_SITE_CACHE_PATH") {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(path.into()),
            Err(_) => Some("./data/site-cache.json".into()),
        };

        let bind_addr = env::var("CMS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid CMS_BIND_ADDR: {}", e)))?;

        let log_level = env::var("CMS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let public_host = env::var("CMS_PUBLIC_HOST").ok().filter(|h| !h.is_empty());

        let snapshot_min_successes = match env::var("CMS_SNAPSHOT_MIN_SUCCESSES") {
            Ok(raw) => Some(raw.parse().map_err(|e| {
                AppError::BadRequest(format!("Invalid CMS_SNAPSHOT_MIN_SUCCESSES: {}", e))
            })?),
            Err(_) => None,
        };

        let generate_on_start = match env::var("CMS_GENERATE_ON_START") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid CMS_GENERATE_ON_START: {}", raw))
            })?,
            Err(_) => true,
        };

        Ok(Self {
            db_path,
            snapshot_dir,
            site_cache_path,
            bind_addr,
            log_level,
            public_host,
            snapshot_min_successes,
            generate_on_start,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
