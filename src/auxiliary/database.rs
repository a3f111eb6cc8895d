use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use super::AuxiliaryCheck;
use crate::config::DatabaseConfig;

/// Opens a fresh PostgreSQL connection and runs `SELECT 1`.
pub struct DatabaseCheck {
    config: DatabaseConfig,
}

impl DatabaseCheck {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> PgConnectOptions {
        // `new()` picks up PGPASSWORD and friends from the environment.
        let opts = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .database(&self.config.database);
        match &self.config.password {
            Some(password) => opts.password(password),
            None => opts,
        }
    }
}

#[async_trait]
impl AuxiliaryCheck for DatabaseCheck {
    fn name(&self) -> &str {
        "Database Status"
    }

    async fn check(&self) -> Result<String> {
        let mut conn = PgConnection::connect_with(&self.options())
            .await
            .with_context(|| format!("connect to {}:{}", self.config.host, self.config.port))?;
        sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .context("SELECT 1")?;
        conn.close().await.context("close connection")?;
        Ok("reachable".into())
    }
}
