// Database module - provides data access layer

use std::sync::Arc;

use color_eyre::{eyre::OptionExt, Result};
use tokio::sync::OnceCell;

pub mod models;
pub use models::*;

mod content;
mod helpers;
mod migrations;
mod plan;
mod progress;
mod user;

pub(crate) use content::JunctionSupport;
pub use progress::AnswerEvent;

// Main database handle
#[derive(Clone)]
pub struct Db {
    db: Arc<libsql::Database>,
    // Junction-table capability, probed once per process.
    junctions: Arc<OnceCell<JunctionSupport>>,
}

impl Db {
    pub async fn new(url: String, auth_token: String) -> Result<Self> {
        let db = if let Some(path) = url.strip_prefix("file:") {
            // Local SQLite file
            libsql::Builder::new_local(path).build().await?
        } else {
            // Remote sqld server
            libsql::Builder::new_remote(url.to_owned(), auth_token)
                .build()
                .await?
        };

        let conn = db.connect()?;

        // Verify connection
        let one = conn
            .query("SELECT 1", ())
            .await?
            .next()
            .await?
            .ok_or_eyre("connection check failed")?
            .get::<i32>(0)?;
        assert_eq!(one, 1);

        migrations::run(&conn).await?;

        tracing::info!("database connection has been verified");

        Ok(Self {
            db: Arc::new(db),
            junctions: Arc::new(OnceCell::new()),
        })
    }

    pub(crate) fn connect(&self) -> Result<libsql::Connection> {
        Ok(self.db.connect()?)
    }

    pub async fn migration_applied(&self, version: &str) -> Result<bool> {
        let conn = self.connect()?;
        let row = conn
            .query(
                "SELECT 1 FROM schema_migrations WHERE version = ?",
                libsql::params![version],
            )
            .await?
            .next()
            .await?;
        Ok(row.is_some())
    }
}
