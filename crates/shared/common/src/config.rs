//! Shared configuration structures.

use serde::{Deserialize, Serialize};

/// URL of a private in-memory SQLite database
pub const IN_MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Echo every SQL statement through the sqlx logger
    pub show_sql: bool,
}

impl DatabaseConfig {
    /// Single-connection in-memory database, as used by tests.
    ///
    /// The pool must hold exactly one connection: every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
            show_sql: false,
        }
    }

    /// Check if the configured database lives in memory
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://members.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 1,
            show_sql: false,
        }
    }
}
