// src/services/template_store.rs
// Durable key-value entry holding the user-defined template map as JSON.
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::path::PathBuf;

use crate::errors::TravelAgentError;

pub const CUSTOM_TEMPLATES_KEY: &str = "travel_agent_custom_templates";

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Returns the stored entry, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<String>, TravelAgentError>;

    /// Overwrites the entry wholesale.
    async fn save(&self, json: &str) -> Result<(), TravelAgentError>;
}

pub struct RedisTemplateStore {
    client: Client,
}

impl RedisTemplateStore {
    pub async fn new(redis_url: &str) -> Result<Self, TravelAgentError> {
        let client = Client::open(redis_url)?;

        // Test connection
        let mut conn = client.get_async_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TemplateStore for RedisTemplateStore {
    async fn load(&self) -> Result<Option<String>, TravelAgentError> {
        let mut conn = self.client.get_async_connection().await?;
        let value: Option<String> = conn.get(CUSTOM_TEMPLATES_KEY).await?;
        Ok(value)
    }

    async fn save(&self, json: &str) -> Result<(), TravelAgentError> {
        let mut conn = self.client.get_async_connection().await?;
        conn.set::<_, _, ()>(CUSTOM_TEMPLATES_KEY, json).await?;
        Ok(())
    }
}

pub struct FileTemplateStore {
    path: PathBuf,
}

impl FileTemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn load(&self) -> Result<Option<String>, TravelAgentError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TravelAgentError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, json: &str) -> Result<(), TravelAgentError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TravelAgentError::Storage(e.to_string()))?;
        }

        // Write beside the target then rename so readers never see half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| TravelAgentError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| TravelAgentError::Storage(format!("Failed to replace {}: {}", self.path.display(), e)))
    }
}
