//! Configuration loading for the Retail API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `RETAIL_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound accepted for `MAX_PAGE_SIZE`.
pub const PAGE_SIZE_CEILING: u64 = 500;

/// Application configuration derived from `RETAIL_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    /// HMAC secret for HS256 bearer JWTs. JWT auth is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Origins allowed by CORS. Empty means same-origin only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// ISO-like code of the currency every amount is stored in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    /// Printed on the invoice header.
    #[serde(default = "default_business_name")]
    pub business_name: String,
    #[serde(default = "default_business_tax_id")]
    pub business_tax_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            jwt_secret: None,
            cors_allowed_origins: Vec::new(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            base_currency: default_base_currency(),
            business_name: default_business_name(),
            business_tax_id: default_business_tax_id(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.operator_tokens.is_empty() {
            config.operator_tokens = vec!["[REDACTED]".to_string()];
        }
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_jwt = self
            .jwt_secret
            .as_deref()
            .is_some_and(|secret| !secret.trim().is_empty());
        if self.operator_tokens.is_empty() && !has_jwt {
            return Err(ConfigError::MissingCredentials);
        }

        if self.max_page_size == 0 || self.max_page_size > PAGE_SIZE_CEILING {
            return Err(ConfigError::InvalidMaxPageSize {
                value: self.max_page_size,
            });
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidDefaultPageSize {
                value: self.default_page_size,
                max: self.max_page_size,
            });
        }

        if !is_currency_code(&self.base_currency) {
            return Err(ConfigError::InvalidBaseCurrency {
                value: self.base_currency.clone(),
            });
        }

        Ok(())
    }
}

/// Returns true for three upper-case ASCII letters.
pub fn is_currency_code(value: &str) -> bool {
    value.len() == 3 && value.bytes().all(|b| b.is_ascii_uppercase())
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://retail.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

fn default_base_currency() -> String {
    "BOB".to_string()
}

fn default_business_name() -> String {
    "RETAIL".to_string()
}

fn default_business_tax_id() -> String {
    "0".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error(
        "no credentials configured; set RETAIL_OPERATOR_TOKEN, RETAIL_OPERATOR_TOKENS or RETAIL_JWT_SECRET"
    )]
    MissingCredentials,
    #[error("invalid value for {key}: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("max page size must be between 1 and {PAGE_SIZE_CEILING}, got {value}")]
    InvalidMaxPageSize { value: u64 },
    #[error("default page size must be between 1 and {max}, got {value}")]
    InvalidDefaultPageSize { value: u64, max: u64 },
    #[error("base currency must be a three letter upper-case code, got '{value}'")]
    InvalidBaseCurrency { value: String },
}

/// Loads configuration using layered `.env` files and `RETAIL_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, validates and returns the layered configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_string(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_number(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take_number(&mut layered, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Comma-separated list wins over the single-token form.
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            split_list(&tokens)
        } else if let Some(token) = take_string(&mut layered, "OPERATOR_TOKEN") {
            vec![token.trim().to_string()]
        } else {
            Vec::new()
        };

        let jwt_secret = take_string(&mut layered, "JWT_SECRET");
        let cors_allowed_origins = layered
            .remove("CORS_ALLOWED_ORIGINS")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        let default_page_size =
            take_number(&mut layered, "DEFAULT_PAGE_SIZE")?.unwrap_or_else(default_page_size);
        let max_page_size =
            take_number(&mut layered, "MAX_PAGE_SIZE")?.unwrap_or_else(default_max_page_size);
        let base_currency = take_string(&mut layered, "BASE_CURRENCY")
            .map(|code| code.trim().to_string())
            .unwrap_or_else(default_base_currency);
        let business_name =
            take_string(&mut layered, "BUSINESS_NAME").unwrap_or_else(default_business_name);
        let business_tax_id =
            take_string(&mut layered, "BUSINESS_TAX_ID").unwrap_or_else(default_business_tax_id);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            jwt_secret,
            cors_allowed_origins,
            default_page_size,
            max_page_size,
            base_currency,
            business_name,
            business_tax_id,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

const ENV_PREFIX: &str = "RETAIL_";

fn take_string(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values.remove(key).filter(|v| !v.trim().is_empty())
}

fn take_number<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match take_string(values, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            operator_tokens: vec!["token".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn default_config_requires_credentials() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn jwt_secret_alone_is_enough() {
        let config = AppConfig {
            jwt_secret: Some("secret".to_string()),
            ..Default::default()
        };
        config.validate().expect("jwt secret satisfies credentials");
    }

    #[test]
    fn blank_jwt_secret_does_not_count() {
        let config = AppConfig {
            jwt_secret: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn page_size_bounds_are_enforced() {
        let mut config = valid_config();
        config.default_page_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDefaultPageSize { .. })
        ));

        let mut config = valid_config();
        config.default_page_size = 150;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDefaultPageSize { value: 150, max: 100 })
        ));

        let mut config = valid_config();
        config.max_page_size = PAGE_SIZE_CEILING + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxPageSize { .. })
        ));
    }

    #[test]
    fn base_currency_must_be_upper_case_code() {
        for bad in ["bob", "BO", "BOBS", "B0B"] {
            let mut config = valid_config();
            config.base_currency = bad.to_string();
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidBaseCurrency { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            operator_tokens: vec!["super-secret".to_string()],
            jwt_secret: Some("jwt-secret".to_string()),
            ..Default::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("jwt-secret"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn split_list_drops_blank_entries() {
        assert_eq!(
            split_list(" a, ,b ,"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
