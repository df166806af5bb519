//! Connection settings.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

/// PostgreSQL connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub dbname: String,
    /// Login role.
    pub user: String,
    /// Login password. Usually supplied through `AMPERE_DB_PASSWORD`.
    #[serde(skip_serializing)]
    pub password: String,
    /// Seconds to wait for a connection.
    pub connect_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "db_demand".to_string(),
            user: "dbuser".to_string(),
            password: String::new(),
            connect_timeout: 5,
        }
    }
}

impl DatabaseConfig {
    /// Connection timeout as a duration.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Driver connection options.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user);
        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }
}
