use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub local_path: String,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language pack for the source documents.
    pub language: String,
    /// Page segmentation mode; 11 is sparse text, which suits bill layouts.
    pub psm: u32,
    /// Rasterization resolution handed to pdftoppm.
    pub dpi: u32,
    pub command_timeout_secs: u64,
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(InvoiceConfig {
            common,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
            },
            ocr: OcrConfig {
                language: get_env("OCR_LANGUAGE", Some("por"), is_prod)?,
                psm: parse_env("OCR_PSM", "11", is_prod)?,
                dpi: parse_env("OCR_DPI", "300", is_prod)?,
                command_timeout_secs: parse_env("OCR_COMMAND_TIMEOUT_SECS", "120", is_prod)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?.parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(format!("Invalid value for {}: {}", key, e)))
    })
}
