//! In-process storage account emulator.
//!
//! Accounts are keyed by account name, so every proxy that resolves the same
//! connection string sees the same tables, queues and containers. Every
//! operation that would be a network round trip against the real service is
//! counted in [`OperationStats`].

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use tokio::time::Instant;
use uuid::Uuid;

use crate::backend::{
    AccountFactory, BlobItem, ContainerHandle, QueueHandle, QueueMessage, StorageAccount,
    TableHandle, TableRecord,
};
use crate::{Result, StorageConnection, StorageError};

/// Counters of emulated remote calls.
#[derive(Debug, Default)]
pub struct OperationStats {
    connects: AtomicU64,
    table_reads: AtomicU64,
    table_writes: AtomicU64,
    queue_operations: AtomicU64,
    blob_operations: AtomicU64,
}

impl OperationStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Account connections made.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Table point reads and partition queries.
    pub fn table_reads(&self) -> u64 {
        self.table_reads.load(Ordering::Relaxed)
    }

    /// Table inserts, replaces and deletes.
    pub fn table_writes(&self) -> u64 {
        self.table_writes.load(Ordering::Relaxed)
    }

    /// Queue calls of any kind.
    pub fn queue_operations(&self) -> u64 {
        self.queue_operations.load(Ordering::Relaxed)
    }

    /// Blob calls of any kind.
    pub fn blob_operations(&self) -> u64 {
        self.blob_operations.load(Ordering::Relaxed)
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        self.connects()
            + self.table_reads()
            + self.table_writes()
            + self.queue_operations()
            + self.blob_operations()
    }
}

/// Account factory backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountFactory {
    accounts: Arc<Mutex<HashMap<String, Arc<MemoryAccount>>>>,
    stats: Arc<OperationStats>,
}

impl MemoryAccountFactory {
    /// Create an empty emulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared operation counters.
    pub fn stats(&self) -> Arc<OperationStats> {
        self.stats.clone()
    }

    /// Look up an account that has been connected to.
    pub fn account(&self, name: &str) -> Option<Arc<MemoryAccount>> {
        self.accounts.lock().get(name).cloned()
    }
}

#[async_trait]
impl AccountFactory for MemoryAccountFactory {
    async fn connect(&self, connection: &StorageConnection) -> Result<Arc<dyn StorageAccount>> {
        OperationStats::bump(&self.stats.connects);
        let name = connection.account_name();
        let account: Arc<dyn StorageAccount> = self
            .accounts
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryAccount::new(name, self.stats.clone())))
            .clone();
        debug!(account = %name, "Connected to in-memory account");
        Ok(account)
    }
}

/// In-memory storage account.
#[derive(Debug)]
pub struct MemoryAccount {
    name: String,
    stats: Arc<OperationStats>,
    tables: Mutex<HashMap<String, Arc<MemoryTable>>>,
    queues: Mutex<HashMap<String, Arc<MemoryQueue>>>,
    containers: Mutex<HashMap<String, Arc<MemoryContainer>>>,
}

impl MemoryAccount {
    fn new(name: &str, stats: Arc<OperationStats>) -> Self {
        Self {
            name: name.to_string(),
            stats,
            tables: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            containers: Mutex::new(HashMap::new()),
        }
    }

    /// Names of the tables opened so far, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the queues opened so far, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the containers opened so far, sorted.
    pub fn container_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.containers.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl StorageAccount for MemoryAccount {
    fn name(&self) -> &str {
        &self.name
    }

    async fn table(&self, name: &str) -> Result<Arc<dyn TableHandle>> {
        let table: Arc<dyn TableHandle> = self
            .tables
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryTable::new(name, self.stats.clone())))
            .clone();
        Ok(table)
    }

    async fn queue(&self, name: &str) -> Result<Arc<dyn QueueHandle>> {
        let queue: Arc<dyn QueueHandle> = self
            .queues
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new(name, self.stats.clone())))
            .clone();
        Ok(queue)
    }

    async fn container(&self, name: &str) -> Result<Arc<dyn ContainerHandle>> {
        let container: Arc<dyn ContainerHandle> = self
            .containers
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryContainer::new(name, self.stats.clone())))
            .clone();
        Ok(container)
    }
}

type RowKey = (String, String);

#[derive(Debug)]
struct MemoryTable {
    name: String,
    stats: Arc<OperationStats>,
    rows: RwLock<BTreeMap<RowKey, TableRecord>>,
}

impl MemoryTable {
    fn new(name: &str, stats: Arc<OperationStats>) -> Self {
        Self {
            name: name.to_string(),
            stats,
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl TableHandle for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<TableRecord>> {
        OperationStats::bump(&self.stats.table_reads);
        let key = (partition_key.to_string(), row_key.to_string());
        Ok(self.rows.read().get(&key).cloned())
    }

    async fn insert(&self, mut record: TableRecord) -> Result<()> {
        OperationStats::bump(&self.stats.table_writes);
        let key = (record.partition_key.clone(), record.row_key.clone());
        let mut rows = self.rows.write();
        if rows.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                partition_key: key.0,
                row_key: key.1,
            });
        }
        record.timestamp = Some(Utc::now());
        rows.insert(key, record);
        Ok(())
    }

    async fn replace(&self, mut record: TableRecord) -> Result<()> {
        OperationStats::bump(&self.stats.table_writes);
        let key = (record.partition_key.clone(), record.row_key.clone());
        record.timestamp = Some(Utc::now());
        self.rows.write().insert(key, record);
        Ok(())
    }

    async fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool> {
        OperationStats::bump(&self.stats.table_writes);
        let key = (partition_key.to_string(), row_key.to_string());
        Ok(self.rows.write().remove(&key).is_some())
    }

    async fn query_partition(&self, partition_key: &str) -> Result<Vec<TableRecord>> {
        OperationStats::bump(&self.stats.table_reads);
        let start = (partition_key.to_string(), String::new());
        Ok(self
            .rows
            .read()
            .range(start..)
            .take_while(|((partition, _), _)| partition == partition_key)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[derive(Debug)]
struct StoredMessage {
    id: String,
    body: String,
    pop_receipt: String,
    dequeue_count: u32,
    inserted_at: chrono::DateTime<Utc>,
    visible_at: Instant,
}

impl StoredMessage {
    fn envelope(&self) -> QueueMessage {
        QueueMessage {
            id: self.id.clone(),
            pop_receipt: self.pop_receipt.clone(),
            body: self.body.clone(),
            dequeue_count: self.dequeue_count,
            inserted_at: self.inserted_at,
        }
    }
}

#[derive(Debug)]
struct MemoryQueue {
    name: String,
    stats: Arc<OperationStats>,
    messages: Mutex<VecDeque<StoredMessage>>,
}

impl MemoryQueue {
    fn new(name: &str, stats: Arc<OperationStats>) -> Self {
        Self {
            name: name.to_string(),
            stats,
            messages: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl QueueHandle for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put_message(&self, body: String) -> Result<QueueMessage> {
        OperationStats::bump(&self.stats.queue_operations);
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            body,
            pop_receipt: Uuid::new_v4().to_string(),
            dequeue_count: 0,
            inserted_at: Utc::now(),
            visible_at: Instant::now(),
        };
        let envelope = message.envelope();
        self.messages.lock().push_back(message);
        Ok(envelope)
    }

    async fn get_message(&self, visibility: Duration) -> Result<Option<QueueMessage>> {
        OperationStats::bump(&self.stats.queue_operations);
        let now = Instant::now();
        let visible_at = now.checked_add(visibility).ok_or_else(|| {
            StorageError::Backend(format!(
                "visibility timeout of {:?} is out of range for queue '{}'",
                visibility, self.name
            ))
        })?;
        let mut messages = self.messages.lock();
        let Some(message) = messages.iter_mut().find(|m| m.visible_at <= now) else {
            return Ok(None);
        };
        message.visible_at = visible_at;
        message.dequeue_count += 1;
        message.pop_receipt = Uuid::new_v4().to_string();
        Ok(Some(message.envelope()))
    }

    async fn peek_message(&self) -> Result<Option<QueueMessage>> {
        OperationStats::bump(&self.stats.queue_operations);
        let now = Instant::now();
        Ok(self
            .messages
            .lock()
            .iter()
            .find(|m| m.visible_at <= now)
            .map(StoredMessage::envelope))
    }

    async fn delete_message(&self, id: &str, pop_receipt: &str) -> Result<()> {
        OperationStats::bump(&self.stats.queue_operations);
        let mut messages = self.messages.lock();
        let position = messages
            .iter()
            .position(|m| m.id == id && m.pop_receipt == pop_receipt)
            .ok_or_else(|| StorageError::NotFound(format!("message {} in queue '{}'", id, self.name)))?;
        messages.remove(position);
        Ok(())
    }

    async fn approximate_len(&self) -> Result<usize> {
        OperationStats::bump(&self.stats.queue_operations);
        Ok(self.messages.lock().len())
    }
}

#[derive(Debug)]
struct StoredBlob {
    data: Bytes,
    content_type: Option<String>,
    last_modified: chrono::DateTime<Utc>,
}

impl StoredBlob {
    fn item(&self, name: &str) -> BlobItem {
        BlobItem {
            name: name.to_string(),
            size: self.data.len() as u64,
            content_type: self.content_type.clone(),
            last_modified: self.last_modified,
        }
    }
}

#[derive(Debug)]
struct MemoryContainer {
    name: String,
    stats: Arc<OperationStats>,
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

impl MemoryContainer {
    fn new(name: &str, stats: Arc<OperationStats>) -> Self {
        Self {
            name: name.to_string(),
            stats,
            blobs: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl ContainerHandle for MemoryContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put_blob(
        &self,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<BlobItem> {
        OperationStats::bump(&self.stats.blob_operations);
        let blob = StoredBlob {
            data,
            content_type: content_type.map(str::to_string),
            last_modified: Utc::now(),
        };
        let item = blob.item(name);
        self.blobs.write().insert(name.to_string(), blob);
        Ok(item)
    }

    async fn get_blob(&self, name: &str) -> Result<Option<Bytes>> {
        OperationStats::bump(&self.stats.blob_operations);
        Ok(self.blobs.read().get(name).map(|b| b.data.clone()))
    }

    async fn delete_blob(&self, name: &str) -> Result<bool> {
        OperationStats::bump(&self.stats.blob_operations);
        Ok(self.blobs.write().remove(name).is_some())
    }

    async fn list_blobs(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        OperationStats::bump(&self.stats.blob_operations);
        let prefix = prefix.unwrap_or_default();
        Ok(self
            .blobs
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, blob)| blob.item(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_entity::PropertyMap;

    async fn account(factory: &MemoryAccountFactory) -> Arc<dyn StorageAccount> {
        factory
            .connect(&StorageConnection::development())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_accounts_are_shared_by_name() {
        let factory = MemoryAccountFactory::new();
        let first = account(&factory).await;
        let second = account(&factory).await;

        first.table("people").await.unwrap();
        assert_eq!(second.name(), StorageConnection::DEVELOPMENT_ACCOUNT);
        let shared = factory.account(StorageConnection::DEVELOPMENT_ACCOUNT).unwrap();
        assert_eq!(shared.table_names(), vec!["people".to_string()]);
        assert_eq!(factory.stats().connects(), 2);
    }

    #[tokio::test]
    async fn test_table_insert_collision_and_replace() {
        let factory = MemoryAccountFactory::new();
        let table = account(&factory).await.table("people").await.unwrap();

        let mut props = PropertyMap::new();
        props.insert("Name", "a");
        table.insert(TableRecord::new("p", "r", props.clone())).await.unwrap();

        let err = table.insert(TableRecord::new("p", "r", props)).await.unwrap_err();
        assert!(err.is_duplicate_key());

        let mut updated = PropertyMap::new();
        updated.insert("Name", "b");
        table.replace(TableRecord::new("p", "r", updated.clone())).await.unwrap();

        let stored = table.get("p", "r").await.unwrap().unwrap();
        assert_eq!(stored.properties, updated);
        assert!(stored.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_query_partition_is_scoped() {
        let factory = MemoryAccountFactory::new();
        let table = account(&factory).await.table("people").await.unwrap();
        for (pk, rk) in [("a", "2"), ("a", "1"), ("b", "1"), ("ab", "1")] {
            table
                .insert(TableRecord::new(pk, rk, PropertyMap::new()))
                .await
                .unwrap();
        }

        let rows = table.query_partition("a").await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert!(table.delete("a", "1").await.unwrap());
        assert!(!table.delete("a", "1").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_visibility_timeout() {
        let factory = MemoryAccountFactory::new();
        let queue = account(&factory).await.queue("jobs").await.unwrap();
        queue.put_message("one".into()).await.unwrap();

        let first = queue.get_message(Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!(first.dequeue_count, 1);
        assert!(queue.get_message(Duration::from_secs(30)).await.unwrap().is_none());
        assert!(queue.peek_message().await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(31)).await;
        let second = queue.get_message(Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.dequeue_count, 2);

        let stale = queue.delete_message(&first.id, &first.pop_receipt).await;
        assert!(stale.unwrap_err().is_not_found());
        queue.delete_message(&second.id, &second.pop_receipt).await.unwrap();
        assert_eq!(queue.approximate_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_visibility_is_rejected() {
        let factory = MemoryAccountFactory::new();
        let queue = account(&factory).await.queue("jobs").await.unwrap();
        queue.put_message("one".into()).await.unwrap();

        let err = queue.get_message(Duration::MAX).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let message = queue.get_message(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(message.dequeue_count, 1);
    }

    #[tokio::test]
    async fn test_container_listing_by_prefix() {
        let factory = MemoryAccountFactory::new();
        let container = account(&factory).await.container("assets").await.unwrap();
        container
            .put_blob("img/a.png", Bytes::from_static(b"a"), Some("image/png"))
            .await
            .unwrap();
        container.put_blob("doc/b.txt", Bytes::from_static(b"bb"), None).await.unwrap();

        let images = container.list_blobs(Some("img/")).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(container.list_blobs(None).await.unwrap().len(), 2);
        assert_eq!(factory.stats().blob_operations(), 4);
    }
}
