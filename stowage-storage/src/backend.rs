//! Remote storage service boundary.
//!
//! Proxies talk to the service only through these traits. An
//! [`AccountFactory`] turns a parsed connection into a [`StorageAccount`],
//! which hands out table, queue and container handles by name. Handles are
//! safe for concurrent use once opened.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use stowage_entity::PropertyMap;

use crate::{Result, StorageConnection};

/// One table row: composite key plus flat properties.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    /// Partition key.
    pub partition_key: String,
    /// Row key.
    pub row_key: String,
    /// Last modification time assigned by the service.
    pub timestamp: Option<DateTime<Utc>>,
    /// Entity properties.
    pub properties: PropertyMap,
}

impl TableRecord {
    /// Create a record that has not been stored yet.
    pub fn new(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            timestamp: None,
            properties,
        }
    }
}

/// A queue message as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Message id.
    pub id: String,
    /// Receipt proving the caller holds the message; required to delete it.
    pub pop_receipt: String,
    /// Text payload.
    pub body: String,
    /// How many times the message has been dequeued.
    pub dequeue_count: u32,
    /// When the message was enqueued.
    pub inserted_at: DateTime<Utc>,
}

/// Blob listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Full blob name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type, if one was set.
    pub content_type: Option<String>,
    /// Last write time.
    pub last_modified: DateTime<Utc>,
}

/// Creates account clients from connection settings.
#[async_trait]
pub trait AccountFactory: Send + Sync {
    /// Connect to the account described by `connection`.
    async fn connect(&self, connection: &StorageConnection) -> Result<Arc<dyn StorageAccount>>;
}

/// A connected storage account.
#[async_trait]
pub trait StorageAccount: Send + Sync {
    /// Account name.
    fn name(&self) -> &str;

    /// Open a table, creating it if it does not exist.
    async fn table(&self, name: &str) -> Result<Arc<dyn TableHandle>>;

    /// Open a queue, creating it if it does not exist.
    async fn queue(&self, name: &str) -> Result<Arc<dyn QueueHandle>>;

    /// Open a blob container, creating it if it does not exist.
    async fn container(&self, name: &str) -> Result<Arc<dyn ContainerHandle>>;
}

/// Operations on one table.
#[async_trait]
pub trait TableHandle: Send + Sync {
    /// Table name.
    fn name(&self) -> &str;

    /// Fetch a record by composite key.
    async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<TableRecord>>;

    /// Create a record; fails with `DuplicateKey` if one exists.
    async fn insert(&self, record: TableRecord) -> Result<()>;

    /// Create or unconditionally replace a record.
    async fn replace(&self, record: TableRecord) -> Result<()>;

    /// Delete a record. Returns whether it existed.
    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool>;

    /// All records of a partition, ordered by row key.
    async fn query_partition(&self, partition_key: &str) -> Result<Vec<TableRecord>>;
}

/// Operations on one queue.
#[async_trait]
pub trait QueueHandle: Send + Sync {
    /// Queue name.
    fn name(&self) -> &str;

    /// Append a message.
    async fn put_message(&self, body: String) -> Result<QueueMessage>;

    /// Take the next visible message and hide it for `visibility`.
    async fn get_message(&self, visibility: Duration) -> Result<Option<QueueMessage>>;

    /// Look at the next visible message without hiding it.
    async fn peek_message(&self) -> Result<Option<QueueMessage>>;

    /// Delete a message previously returned by `get_message`.
    async fn delete_message(&self, id: &str, pop_receipt: &str) -> Result<()>;

    /// Number of messages, visible or not.
    async fn approximate_len(&self) -> Result<usize>;
}

/// Operations on one blob container.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Container name.
    fn name(&self) -> &str;

    /// Write a blob, replacing any previous content.
    async fn put_blob(&self, name: &str, data: Bytes, content_type: Option<&str>)
    -> Result<BlobItem>;

    /// Read a blob.
    async fn get_blob(&self, name: &str) -> Result<Option<Bytes>>;

    /// Delete a blob. Returns whether it existed.
    async fn delete_blob(&self, name: &str) -> Result<bool>;

    /// List blobs whose names start with `prefix`.
    async fn list_blobs(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>>;
}
