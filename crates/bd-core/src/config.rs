//! Configuration types and loading
//!
//! All settings are env-based; the server binary loads a `.env` file first.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// When false, unauthenticated requests run as an anonymous caller.
    /// Authentication itself lives in the hosting platform.
    pub require_authentication: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulingConfig {
    pub null_anchor_policy: NullAnchorPolicy,
}

/// What to do when a schedule recompute runs against a work package whose
/// effective start date is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NullAnchorPolicy {
    /// Clear all estimated dates and leave the package unscheduled.
    #[default]
    Unscheduled,
    /// Reject the recompute with a state error.
    Strict,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/bizdev_crm".to_string(),
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            auth: AuthConfig {
                require_authentication: true,
            },
            scheduling: SchedulingConfig {
                null_anchor_policy: NullAnchorPolicy::Unscheduled,
            },
        }
    }
}

impl AppConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", defaults.database.url),
                max_connections: env_parse("DB_MAX_CONNECTIONS", defaults.database.max_connections),
                connect_timeout_secs: env_parse(
                    "DB_CONNECT_TIMEOUT",
                    defaults.database.connect_timeout_secs,
                ),
            },
            server: ServerConfig {
                host: env_or("SERVER_HOST", defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
            },
            auth: AuthConfig {
                require_authentication: env_parse(
                    "REQUIRE_AUTHENTICATION",
                    defaults.auth.require_authentication,
                ),
            },
            scheduling: SchedulingConfig {
                null_anchor_policy: match std::env::var("NULL_ANCHOR_POLICY").as_deref() {
                    Ok("strict") => NullAnchorPolicy::Strict,
                    _ => NullAnchorPolicy::Unscheduled,
                },
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.scheduling.null_anchor_policy,
            NullAnchorPolicy::Unscheduled
        );
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }
}
