use std::env;

use thiserror::Error;

/// Documented fallback for `ADMIN_IMPORT_KEY`. Real deployments must override it.
pub const INSECURE_DEFAULT_IMPORT_KEY: &str = "salon-knjige-admin-2026";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Shared secret required by the import mutation.
    pub admin_import_key: String,
    /// Login identity promoted to admin on first sign-in.
    pub owner_open_id: Option<String>,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://salon_knjige.db?mode=rwc".to_string());

        let port = match env::var("PORT") {
            Ok(p) => p.parse().map_err(|_| ConfigError::InvalidEnvValue {
                var: "PORT".to_string(),
                reason: format!("'{}' is not a valid port number", p),
            })?,
            Err(_) => 3000,
        };

        let admin_import_key = env::var("ADMIN_IMPORT_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!(
                    "ADMIN_IMPORT_KEY is not set, falling back to the insecure default import key"
                );
                INSECURE_DEFAULT_IMPORT_KEY.to_string()
            });

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => "secret".to_string(),
            _ => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
        };

        Ok(Self {
            database_url,
            port,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            admin_import_key,
            owner_open_id: env::var("OWNER_OPEN_ID").ok().filter(|s| !s.is_empty()),
            jwt_secret,
        })
    }

    /// Configuration with development defaults for the given database.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: 3000,
            cors_allowed_origins: Vec::new(),
            admin_import_key: INSECURE_DEFAULT_IMPORT_KEY.to_string(),
            owner_open_id: None,
            jwt_secret: "secret".to_string(),
        }
    }
}
