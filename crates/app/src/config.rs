use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_url: String,
    pub token_secret: Option<String>,
    pub admin_password_hash: Option<String>,
    pub cors_allow_origins: Vec<String>,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub default_tree_depth: usize,
    pub max_tree_depth: usize,
    pub max_content_len: usize,
    pub max_bulk_size: usize,
    pub auto_approve: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required value for {0}")]
    MissingValue(&'static str),
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid boolean for {0}: {1}")]
    InvalidBool(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr_raw = read_string("MARGINALIA_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let database_url = read_optional_string("MARGINALIA_DATABASE_URL")
            .ok_or(ConfigError::MissingValue("MARGINALIA_DATABASE_URL"))?;
        let token_secret = read_optional_string("MARGINALIA_TOKEN_SECRET");
        let admin_password_hash = read_optional_string("MARGINALIA_ADMIN_PASSWORD_HASH");
        let cors_allow_origins = read_optional_string("MARGINALIA_CORS_ALLOW_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();
        let default_page_size = read_i64("MARGINALIA_DEFAULT_PAGE_SIZE", 20)?;
        let max_page_size = read_i64("MARGINALIA_MAX_PAGE_SIZE", 100)?;
        let default_tree_depth = read_usize("MARGINALIA_DEFAULT_TREE_DEPTH", 3)?;
        let max_tree_depth = read_usize("MARGINALIA_MAX_TREE_DEPTH", 10)?;
        let max_content_len = read_usize("MARGINALIA_MAX_CONTENT_LEN", 10_000)?;
        let max_bulk_size = read_usize("MARGINALIA_MAX_BULK_SIZE", 100)?;
        let auto_approve = read_bool("MARGINALIA_AUTO_APPROVE", false)?;

        Ok(Self {
            http_addr,
            database_url,
            token_secret,
            admin_password_hash,
            cors_allow_origins,
            default_page_size,
            max_page_size,
            default_tree_depth,
            max_tree_depth,
            max_content_len,
            max_bulk_size,
            auto_approve,
        })
    }
}

pub fn load_dotenv() {
    // Missing .env is the common case in production; ignore it.
    let _ = dotenvy::dotenv();
}

fn read_string(key: &'static str, default: &'static str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_optional_string(key: &'static str) -> Option<String> {
    let value = std::env::var(key).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_i64(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_usize(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool(key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_bool, parse_origins};

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_origins_splits_and_trims() {
        let origins = parse_origins("https://a.example , https://b.example,,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }
}
