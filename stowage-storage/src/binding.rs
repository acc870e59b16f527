//! Lazily resolved, connection-scoped resource handles.
//!
//! Every proxy owns a [`Binding`]: the connection name, the canonical
//! resource name and a cached handle. The cache is filled by the first
//! operation and cleared whenever the connection or resource name changes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use stowage_naming::{IdentifierKind, normalize_flat_identifier};

use crate::backend::{ContainerHandle, QueueHandle, StorageAccount, TableHandle};
use crate::{Result, StorageEnvironment, StorageError};

/// Client state of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// No connection name set; every operation fails with `NotConfigured`.
    Unconfigured,
    /// Configured; the next operation connects and opens the resource.
    Unresolved,
    /// A cached handle is in use.
    Resolved,
}

/// A kind of named resource inside a storage account.
#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    /// Handle type opened for this kind.
    type Handle: ?Sized + Send + Sync;

    /// Human readable kind, for logs.
    const LABEL: &'static str;

    /// Canonicalize a raw resource name.
    fn normalize(raw: &str) -> Result<String>;

    /// Open the named resource on `account`.
    async fn open(account: &dyn StorageAccount, name: &str) -> Result<Arc<Self::Handle>>;
}

/// Tables.
#[derive(Debug)]
pub struct TableResource;

/// Queues.
#[derive(Debug)]
pub struct QueueResource;

/// Blob containers.
#[derive(Debug)]
pub struct ContainerResource;

#[async_trait]
impl ResourceKind for TableResource {
    type Handle = dyn TableHandle;
    const LABEL: &'static str = "table";

    fn normalize(raw: &str) -> Result<String> {
        Ok(normalize_flat_identifier(raw, IdentifierKind::Table)?)
    }

    async fn open(account: &dyn StorageAccount, name: &str) -> Result<Arc<Self::Handle>> {
        account.table(name).await
    }
}

#[async_trait]
impl ResourceKind for QueueResource {
    type Handle = dyn QueueHandle;
    const LABEL: &'static str = "queue";

    fn normalize(raw: &str) -> Result<String> {
        Ok(normalize_flat_identifier(raw, IdentifierKind::Queue)?)
    }

    async fn open(account: &dyn StorageAccount, name: &str) -> Result<Arc<Self::Handle>> {
        account.queue(name).await
    }
}

#[async_trait]
impl ResourceKind for ContainerResource {
    type Handle = dyn ContainerHandle;
    const LABEL: &'static str = "container";

    fn normalize(raw: &str) -> Result<String> {
        Ok(normalize_flat_identifier(raw, IdentifierKind::Container)?)
    }

    async fn open(account: &dyn StorageAccount, name: &str) -> Result<Arc<Self::Handle>> {
        account.container(name).await
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

pub(crate) struct Binding<K: ResourceKind> {
    environment: StorageEnvironment,
    connection_name: Option<String>,
    resource_name: String,
    handle: RwLock<Option<Arc<K::Handle>>>,
}

impl<K: ResourceKind> Binding<K> {
    pub(crate) fn new(environment: StorageEnvironment, raw_name: &str) -> Result<Self> {
        Ok(Self {
            environment,
            connection_name: None,
            resource_name: K::normalize(raw_name)?,
            handle: RwLock::new(None),
        })
    }

    pub(crate) fn connection_name(&self) -> Option<&str> {
        self.connection_name.as_deref()
    }

    pub(crate) fn set_connection_name(&mut self, name: Option<String>) {
        self.connection_name = name;
        self.invalidate();
    }

    pub(crate) fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub(crate) fn set_resource_name(&mut self, raw: &str) -> Result<()> {
        self.resource_name = K::normalize(raw)?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn invalidate(&mut self) {
        *self.handle.get_mut() = None;
    }

    pub(crate) fn state(&self) -> ProxyState {
        if self.connection_name.is_none() {
            ProxyState::Unconfigured
        } else if self.handle.read().is_some() {
            ProxyState::Resolved
        } else {
            ProxyState::Unresolved
        }
    }

    /// Fail unless a connection name is set. Runs before any other work.
    pub(crate) fn ensure_configured(&self) -> Result<&str> {
        self.connection_name.as_deref().ok_or_else(|| {
            StorageError::NotConfigured(format!(
                "no connection name set for {} '{}'",
                K::LABEL,
                self.resource_name
            ))
        })
    }

    pub(crate) async fn handle(&self) -> Result<Arc<K::Handle>> {
        let connection_name = self.ensure_configured()?;
        let cached = self.handle.read().clone();
        if let Some(handle) = cached {
            return Ok(handle);
        }

        info!(
            kind = K::LABEL,
            resource = %self.resource_name,
            connection = %connection_name,
            "Resolving storage client"
        );
        let account = self.environment.connect(connection_name).await?;
        let opened = K::open(account.as_ref(), &self.resource_name).await?;

        // Concurrent first use may race; the first stored handle wins.
        let mut slot = self.handle.write();
        Ok(slot.get_or_insert(opened).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryAccountFactory;
    use stowage_config::ConfigManager;

    fn environment(factory: &MemoryAccountFactory) -> StorageEnvironment {
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        StorageEnvironment::in_memory(settings, factory)
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<TableResource>(), "TableResource");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let factory = MemoryAccountFactory::new();
        let mut binding = Binding::<TableResource>::new(environment(&factory), "Widgets").unwrap();
        assert_eq!(binding.resource_name(), "widgets");
        assert_eq!(binding.state(), ProxyState::Unconfigured);
        assert!(binding.handle().await.err().unwrap().is_not_configured());

        binding.set_connection_name(Some("Storage".into()));
        assert_eq!(binding.state(), ProxyState::Unresolved);

        binding.handle().await.unwrap();
        binding.handle().await.unwrap();
        assert_eq!(binding.state(), ProxyState::Resolved);
        assert_eq!(factory.stats().connects(), 1);

        binding.set_resource_name("Gadgets").unwrap();
        assert_eq!(binding.state(), ProxyState::Unresolved);
        let handle = binding.handle().await.unwrap();
        assert_eq!(handle.name(), "gadgets");
        assert_eq!(factory.stats().connects(), 2);
    }

    #[test]
    fn test_invalid_resource_name_rejected() {
        let factory = MemoryAccountFactory::new();
        let result = Binding::<QueueResource>::new(environment(&factory), "!!");
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
