//! Blob container proxy.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;
use stowage_naming::normalize_hierarchical_path;

use crate::backend::BlobItem;
use crate::binding::{Binding, ContainerResource, ProxyState};
use crate::{Result, StorageEnvironment};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Access to the blobs of one container.
///
/// Blob names go through [`normalize_hierarchical_path`]; by default the
/// lenient mode is used, [`with_strict_names`](Self::with_strict_names)
/// rejects names with characters outside the strict set instead.
pub struct BlobProxy {
    binding: Binding<ContainerResource>,
    strict_names: bool,
}

impl BlobProxy {
    /// Create a proxy bound to `container`.
    pub fn new(environment: StorageEnvironment, container: &str) -> Result<Self> {
        Ok(Self {
            binding: Binding::new(environment, container)?,
            strict_names: false,
        })
    }

    /// Set the connection name.
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.set_connection_name(name);
        self
    }

    /// Reject blob names that need more than separator cleanup.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Canonical container name.
    pub fn container_name(&self) -> &str {
        self.binding.resource_name()
    }

    /// Change the container. Drops the cached client.
    pub fn set_container_name(&mut self, name: &str) -> Result<()> {
        self.binding.set_resource_name(name)
    }

    /// Configured connection name.
    pub fn connection_name(&self) -> Option<&str> {
        self.binding.connection_name()
    }

    /// Change the connection name. Drops the cached client.
    pub fn set_connection_name(&mut self, name: impl Into<String>) {
        self.binding.set_connection_name(Some(name.into()));
    }

    /// Client state.
    pub fn state(&self) -> ProxyState {
        self.binding.state()
    }

    /// Canonical form of a blob name under this proxy's mode.
    pub fn blob_name(&self, raw: &str) -> Result<String> {
        Ok(normalize_hierarchical_path(raw, self.strict_names)?)
    }

    /// Write raw bytes.
    pub async fn put_bytes(&self, name: &str, data: impl Into<Bytes>) -> Result<BlobItem> {
        self.put(name, data.into(), None).await
    }

    /// Write UTF-8 text.
    pub async fn put_text(&self, name: &str, text: &str) -> Result<BlobItem> {
        let data = Bytes::copy_from_slice(text.as_bytes());
        self.put(name, data, Some(TEXT_CONTENT_TYPE)).await
    }

    /// Write a value as JSON.
    pub async fn put_json<T: Serialize>(&self, name: &str, value: &T) -> Result<BlobItem> {
        self.binding.ensure_configured()?;
        let data = Bytes::from(serde_json::to_vec(value)?);
        self.put(name, data, Some(JSON_CONTENT_TYPE)).await
    }

    /// Read raw bytes.
    pub async fn get_bytes(&self, name: &str) -> Result<Option<Bytes>> {
        self.binding.ensure_configured()?;
        let name = self.blob_name(name)?;
        let container = self.binding.handle().await?;
        container.get_blob(&name).await
    }

    /// Read UTF-8 text.
    pub async fn get_text(&self, name: &str) -> Result<Option<String>> {
        match self.get_bytes(name).await? {
            Some(data) => Ok(Some(String::from_utf8(data.to_vec())?)),
            None => Ok(None),
        }
    }

    /// Read a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.get_bytes(name).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Delete a blob. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.binding.ensure_configured()?;
        let name = self.blob_name(name)?;
        let container = self.binding.handle().await?;
        container.delete_blob(&name).await
    }

    /// Whether a blob exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_bytes(name).await?.is_some())
    }

    /// List blobs, optionally under a name prefix.
    ///
    /// The prefix is matched as given.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        self.binding.ensure_configured()?;
        let container = self.binding.handle().await?;
        container.list_blobs(prefix).await
    }

    async fn put(&self, name: &str, data: Bytes, content_type: Option<&str>) -> Result<BlobItem> {
        self.binding.ensure_configured()?;
        let name = self.blob_name(name)?;
        let container = self.binding.handle().await?;
        let item = container.put_blob(&name, data, content_type).await?;
        debug!(
            blob = %item.name,
            size = item.size,
            container = %self.container_name(),
            "Stored blob"
        );
        Ok(item)
    }
}

impl fmt::Debug for BlobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobProxy")
            .field("container", &self.binding.resource_name())
            .field("connection", &self.binding.connection_name())
            .field("strict_names", &self.strict_names)
            .field("state", &self.binding.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryAccountFactory;
    use serde::Deserialize;
    use stowage_config::ConfigManager;

    fn proxy(factory: &MemoryAccountFactory) -> BlobProxy {
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        BlobProxy::new(StorageEnvironment::in_memory(settings, factory), "Report-Archive")
            .unwrap()
            .with_connection_name("Storage")
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Summary {
        pages: u32,
    }

    #[test]
    fn test_container_name_keeps_dashes() {
        assert_eq!(proxy(&MemoryAccountFactory::new()).container_name(), "report-archive");
    }

    #[tokio::test]
    async fn test_names_are_normalized_on_every_operation() {
        let factory = MemoryAccountFactory::new();
        let blobs = proxy(&factory);

        let item = blobs.put_text("2024//q1/../summary..txt", "hello").await.unwrap();
        assert_eq!(item.name, "2024/q1.summary.txt");
        assert_eq!(blobs.get_text("2024/q1.summary.txt").await.unwrap().as_deref(), Some("hello"));
        assert!(blobs.exists("/2024/q1.summary.txt/").await.unwrap());
    }

    #[tokio::test]
    async fn test_json_and_listing() {
        let factory = MemoryAccountFactory::new();
        let blobs = proxy(&factory);
        blobs.put_json("meta/a.json", &Summary { pages: 3 }).await.unwrap();
        blobs.put_bytes("data/a.bin", vec![1u8, 2, 3]).await.unwrap();

        let summary: Option<Summary> = blobs.get_json("meta/a.json").await.unwrap();
        assert_eq!(summary, Some(Summary { pages: 3 }));

        let listed = blobs.list(Some("meta/")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content_type.as_deref(), Some("application/json"));

        assert!(blobs.delete("data/a.bin").await.unwrap());
        assert_eq!(blobs.get_bytes("data/a.bin").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_before_network() {
        let factory = MemoryAccountFactory::new();
        let blobs = proxy(&factory).with_strict_names(true);

        let err = blobs.put_text("my report.txt", "x").await.unwrap_err();
        assert!(err.is_invalid_name());
        assert_eq!(factory.stats().total(), 0);
    }
}
