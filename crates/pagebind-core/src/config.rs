//! Configuration module
//!
//! Runtime configuration for the conversion service, loaded from the
//! environment (and an optional `.env` file). The batch limits are folded into
//! a [`ResourceLimits`] value once at startup and never change afterwards.

use std::env;

// Common constants
const DEFAULT_PORT: u16 = 8787;
const MAX_IMAGES: usize = 100;
const MAX_FILE_SIZE_MB: u64 = 15;
const MAX_TOTAL_SIZE_MB: u64 = 100;
const MEMORY_WATERMARK_MB: u64 = 128;
const INGEST_YIELD_KIB: usize = 100;
const HTTP_CONCURRENCY_LIMIT: usize = 64;
const DEFAULT_OUTPUT_NAME: &str = "converted_images";

/// Batch limits enforced by the validator and the ingester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_item_count: usize,
    pub max_item_size_bytes: u64,
    pub max_total_size_bytes: u64,
    pub memory_watermark_bytes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_item_count: MAX_IMAGES,
            max_item_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            max_total_size_bytes: MAX_TOTAL_SIZE_MB * 1024 * 1024,
            memory_watermark_bytes: MEMORY_WATERMARK_MB * 1024 * 1024,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
    pub limits: ResourceLimits,
    /// Bytes read between cooperative yields during ingestion.
    pub ingest_yield_bytes: usize,
    pub default_output_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            limits: ResourceLimits::default(),
            ingest_yield_bytes: INGEST_YIELD_KIB * 1024,
            default_output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    parse_setting(key, env::var(key).ok().as_deref(), default)
}

/// Parse a raw setting; unset or blank means `default`, anything else must parse.
fn parse_setting<T: std::str::FromStr>(
    key: &str,
    raw: Option<&str>,
    default: T,
) -> Result<T, anyhow::Error> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, value)),
    }
}

fn scaled(key: &str, value: u64, factor: u64) -> Result<u64, anyhow::Error> {
    value
        .checked_mul(factor)
        .ok_or_else(|| anyhow::anyhow!("{} is too large", key))
}

fn env_mib(key: &str, default: u64) -> Result<u64, anyhow::Error> {
    scaled(key, env_or(key, default)?, 1024 * 1024)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = env_or("PORT", DEFAULT_PORT)?;

        let limits = ResourceLimits {
            max_item_count: env_or("MAX_IMAGES", MAX_IMAGES)?,
            max_item_size_bytes: env_mib("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB)?,
            max_total_size_bytes: env_mib("MAX_TOTAL_SIZE_MB", MAX_TOTAL_SIZE_MB)?,
            memory_watermark_bytes: env_mib("MEMORY_WATERMARK_MB", MEMORY_WATERMARK_MB)?,
        };

        let default_output_name = env::var("DEFAULT_OUTPUT_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());

        let config = Config {
            server_port,
            environment,
            cors_origins,
            http_concurrency_limit: env_or("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT)?,
            limits,
            ingest_yield_bytes: usize::try_from(scaled(
                "INGEST_YIELD_KIB",
                env_or("INGEST_YIELD_KIB", INGEST_YIELD_KIB as u64)?,
                1024,
            )?)
            .map_err(|_| anyhow::anyhow!("INGEST_YIELD_KIB is too large"))?,
            default_output_name,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let limits = &self.limits;
        if limits.max_item_count == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGES must be at least 1"));
        }
        if limits.max_item_size_bytes == 0 || limits.max_total_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB and MAX_TOTAL_SIZE_MB must be at least 1"
            ));
        }
        if limits.max_item_size_bytes > limits.max_total_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB cannot exceed MAX_TOTAL_SIZE_MB"
            ));
        }
        if limits.memory_watermark_bytes == 0 {
            return Err(anyhow::anyhow!("MEMORY_WATERMARK_MB must be at least 1"));
        }
        if self.ingest_yield_bytes == 0 {
            return Err(anyhow::anyhow!("INGEST_YIELD_KIB must be at least 1"));
        }
        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.max_item_count, 100);
        assert_eq!(limits.max_item_size_bytes, 15 * 1024 * 1024);
        assert_eq!(limits.max_total_size_bytes, 100 * 1024 * 1024);
        assert_eq!(limits.memory_watermark_bytes, 128 * 1024 * 1024);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
        assert_eq!(config.default_output_name, "converted_images");
    }

    #[test]
    fn test_validate_rejects_item_ceiling_above_total() {
        let mut config = Config::default();
        config.limits.max_item_size_bytes = config.limits.max_total_size_bytes + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_quantum() {
        let config = Config {
            ingest_yield_bytes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unset_or_blank_setting_uses_default() {
        assert_eq!(parse_setting("MAX_IMAGES", None, 100usize).unwrap(), 100);
        assert_eq!(parse_setting("MAX_IMAGES", Some("  "), 100usize).unwrap(), 100);
        assert_eq!(parse_setting("MAX_IMAGES", Some(" 12 "), 100usize).unwrap(), 12);
    }

    #[test]
    fn test_malformed_setting_is_an_error() {
        let err = parse_setting("MAX_IMAGES", Some("lots"), 100usize).unwrap_err();
        assert!(err.to_string().contains("MAX_IMAGES"));
        assert!(parse_setting("MAX_FILE_SIZE_MB", Some("-1"), 15u64).is_err());
        assert!(parse_setting("PORT", Some("70000"), 8787u16).is_err());
    }

    #[test]
    fn test_megabyte_scaling_overflow_is_an_error() {
        assert_eq!(scaled("MAX_FILE_SIZE_MB", 15, 1024 * 1024).unwrap(), 15 * 1024 * 1024);
        assert!(scaled("MAX_FILE_SIZE_MB", u64::MAX / 1024, 1024 * 1024).is_err());
    }
}
