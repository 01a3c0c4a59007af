//! Member service configuration.

use std::env;

use common::DatabaseConfig;

/// Member service configuration.
#[derive(Debug, Clone, Default)]
pub struct MemberServiceConfig {
    pub database: DatabaseConfig,
}

impl MemberServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            database: DatabaseConfig {
                url: env::var("MEMBER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.url),
                max_connections: parse_var("MEMBER_SERVICE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.max_connections),
                min_connections: parse_var("MEMBER_SERVICE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.min_connections),
                show_sql: parse_var("MEMBER_SERVICE_SHOW_SQL").unwrap_or(defaults.show_sql),
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
