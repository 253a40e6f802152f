//! Client-side login sync: push pending progress records from the local
//! outbox to the backend, removing each record only once the server confirms
//! it. Guided and free-style syncs run concurrently and fail independently;
//! within guided sync, records are handled one at a time.

pub mod outbox;

pub use outbox::{FileOutbox, MemoryOutbox, ProgressOutbox};

use color_eyre::{eyre::bail, Result};

use crate::names;

pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct GuidedSyncReport {
    pub synced: usize,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct FreeStyleSyncReport {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct SyncReport {
    pub success: bool,
    pub guided: GuidedSyncReport,
    pub free_style: FreeStyleSyncReport,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            user_id: None,
        }
    }

    /// Embed a user id in each payload, for backends using custom auth
    /// schemes that cannot derive the user from the bearer token.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Migrate everything the outbox holds. Never panics through: per-record
    /// problems are collected into the report and the offending records stay
    /// in the outbox for the next login.
    pub async fn sync_all(&self, outbox: &dyn ProgressOutbox) -> SyncReport {
        let (guided, free_style) =
            tokio::join!(self.sync_guided(outbox), self.sync_free_style(outbox));

        let success = guided.errors.is_empty() && free_style.success;
        SyncReport {
            success,
            guided,
            free_style,
        }
    }

    async fn sync_guided(&self, outbox: &dyn ProgressOutbox) -> GuidedSyncReport {
        let mut report = GuidedSyncReport::default();

        let keys = match outbox.keys() {
            Ok(keys) => keys,
            Err(e) => {
                report.errors.push(format!("could not list outbox keys: {e}"));
                return report;
            }
        };

        for key in keys {
            let Some(plan_id) = key.strip_prefix(names::GUIDED_OUTBOX_PREFIX) else {
                continue;
            };
            let plan_id = plan_id.to_string();

            match self.sync_guided_record(outbox, &key, &plan_id).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    tracing::warn!("guided sync failed for plan {plan_id}: {e}");
                    report.errors.push(format!("plan {plan_id}: {e}"));
                }
            }
        }

        report
    }

    async fn sync_guided_record(
        &self,
        outbox: &dyn ProgressOutbox,
        key: &str,
        plan_id: &str,
    ) -> Result<()> {
        let Some(raw) = outbox.get(key)? else {
            bail!("outbox entry disappeared");
        };

        // Malformed local JSON is a per-record error; the key is kept so the
        // payload stays inspectable.
        let mut payload: serde_json::Value = serde_json::from_str(&raw)?;
        if let Some(obj) = payload.as_object_mut() {
            obj.entry("planId")
                .or_insert_with(|| serde_json::Value::String(plan_id.to_string()));
        }

        self.post(names::GUIDED_SYNC_URL, payload).await?;

        // Confirmed by the server; only now does the local copy go away.
        outbox.remove(key)?;
        tracing::info!("guided progress synced for plan {plan_id}");
        Ok(())
    }

    async fn sync_free_style(&self, outbox: &dyn ProgressOutbox) -> FreeStyleSyncReport {
        match self.sync_free_style_record(outbox).await {
            Ok(()) => FreeStyleSyncReport {
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("free-style sync failed: {e}");
                FreeStyleSyncReport {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn sync_free_style_record(&self, outbox: &dyn ProgressOutbox) -> Result<()> {
        let Some(raw) = outbox.get(names::FREE_STYLE_OUTBOX_KEY)? else {
            // Nothing pending is a successful sync.
            return Ok(());
        };

        let payload: serde_json::Value = serde_json::from_str(&raw)?;
        self.post(names::FREE_STYLE_SYNC_URL, payload).await?;

        outbox.remove(names::FREE_STYLE_OUTBOX_KEY)?;
        tracing::info!("free-style progress synced");
        Ok(())
    }

    async fn post(&self, path: &str, mut payload: serde_json::Value) -> Result<()> {
        if let (Some(user_id), Some(obj)) = (&self.user_id, payload.as_object_mut()) {
            obj.insert(
                "userId".to_string(),
                serde_json::Value::String(user_id.clone()),
            );
        }

        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("server returned {status}: {text}");
        }

        Ok(())
    }
}
