//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::store::DeletePolicy;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// How long a request waits for a pooled connection
    pub database_acquire_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// What removing a row with dependents does
    pub delete_policy: DeletePolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let acquire_timeout_secs: u64 = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_ACQUIRE_TIMEOUT_SECS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let delete_policy = env::var("DELETE_POLICY")
            .unwrap_or_else(|_| DeletePolicy::default().to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DELETE_POLICY"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            host,
            port,
            environment,
            delete_policy,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global; keep every env mutation in
    // this one test.
    #[test]
    fn test_from_env() {
        env::remove_var("DATABASE_URL");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingEnv("DATABASE_URL"))
        ));

        env::set_var("DATABASE_URL", "postgres://localhost/bookkeeper");
        env::remove_var("PORT");
        env::remove_var("DELETE_POLICY");
        env::remove_var("DATABASE_ACQUIRE_TIMEOUT_SECS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.delete_policy, DeletePolicy::Restrict);
        assert_eq!(config.database_acquire_timeout, Duration::from_secs(5));

        env::set_var("DELETE_POLICY", "cascade");
        assert_eq!(Config::from_env().unwrap().delete_policy, DeletePolicy::Cascade);

        env::set_var("DELETE_POLICY", "orphan");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue("DELETE_POLICY"))
        ));
        env::remove_var("DELETE_POLICY");

        env::set_var("PORT", "not-a-port");
        assert!(matches!(Config::from_env(), Err(ConfigError::InvalidValue("PORT"))));
        env::remove_var("PORT");
    }
}
