//! Typed table proxy.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use stowage_entity::{flatten, unflatten};
use tracing::{debug, warn};
use stowage_naming::normalize_key;

use crate::backend::TableRecord;
use crate::binding::{Binding, ProxyState, TableResource, short_type_name};
use crate::{Result, StorageEnvironment, StorageError};

type KeyFn<E> = Arc<dyn Fn(&E) -> String + Send + Sync>;

/// Typed access to one table.
///
/// Entities are flattened into property maps on the way in and rebuilt on
/// the way out. The composite key of an entity comes from the two key
/// functions given at construction; they must be pure, because the same
/// keys are used to find the record again.
///
/// ```no_run
/// # use serde::{Deserialize, Serialize};
/// # use stowage_storage::{StorageEnvironment, TableProxy};
/// #[derive(Default, Serialize, Deserialize)]
/// #[serde(default, rename_all = "PascalCase")]
/// struct Customer {
///     region: String,
///     id: String,
///     name: String,
/// }
///
/// # async fn example(env: StorageEnvironment) -> stowage_storage::Result<()> {
/// let customers = TableProxy::<Customer>::new(env, |c| c.region.clone(), |c| c.id.clone())?
///     .with_connection_name("Storage");
///
/// customers.insert_or_update(&Customer {
///     region: "eu".into(),
///     id: "42".into(),
///     name: "Ada".into(),
/// }).await?;
/// let found = customers.get("eu", "42").await?;
/// # Ok(())
/// # }
/// ```
pub struct TableProxy<E> {
    binding: Binding<TableResource>,
    partition_key: KeyFn<E>,
    row_key: KeyFn<E>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> TableProxy<E>
where
    E: Serialize + DeserializeOwned,
{
    /// Create a proxy whose table is named after the entity type.
    pub fn new<P, R>(environment: StorageEnvironment, partition_key: P, row_key: R) -> Result<Self>
    where
        P: Fn(&E) -> String + Send + Sync + 'static,
        R: Fn(&E) -> String + Send + Sync + 'static,
    {
        Ok(Self {
            binding: Binding::new(environment, short_type_name::<E>())?,
            partition_key: Arc::new(partition_key),
            row_key: Arc::new(row_key),
            _entity: PhantomData,
        })
    }

    /// Use a different table name.
    pub fn with_table_name(mut self, name: &str) -> Result<Self> {
        self.set_table_name(name)?;
        Ok(self)
    }

    /// Set the connection name.
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.set_connection_name(name);
        self
    }

    /// Canonical table name.
    pub fn table_name(&self) -> &str {
        self.binding.resource_name()
    }

    /// Change the table name. Drops the cached client.
    pub fn set_table_name(&mut self, name: &str) -> Result<()> {
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

    /// Remove the connection name.
    pub fn clear_connection_name(&mut self) {
        self.binding.set_connection_name(None);
    }

    /// Client state.
    pub fn state(&self) -> ProxyState {
        self.binding.state()
    }

    /// Canonical composite key of an entity.
    pub fn keys_of(&self, entity: &E) -> Result<(String, String)> {
        let partition_key = normalize_key(&(self.partition_key)(entity))?;
        let row_key = normalize_key(&(self.row_key)(entity))?;
        Ok((partition_key, row_key))
    }

    /// Fetch an entity. `None` if no record has this key.
    pub async fn get(&self, partition_key: &str, row_key: &str) -> Result<Option<E>> {
        self.binding.ensure_configured()?;
        let partition_key = normalize_key(partition_key)?;
        let row_key = normalize_key(row_key)?;

        let table = self.binding.handle().await?;
        match table.get(&partition_key, &row_key).await? {
            Some(record) => Ok(Some(unflatten(&record.properties)?)),
            None => {
                debug!(
                    partition_key = %partition_key,
                    row_key = %row_key,
                    table = %self.table_name(),
                    "Entity not found"
                );
                Ok(None)
            }
        }
    }

    /// Insert an entity. Fails with `DuplicateKey` if its key is taken.
    pub async fn insert(&self, entity: &E) -> Result<()> {
        let record = self.record_of(entity)?;
        let (partition_key, row_key) = (record.partition_key.clone(), record.row_key.clone());

        let table = self.binding.handle().await?;
        match table.insert(record).await {
            Ok(()) => {
                debug!(
                    partition_key = %partition_key,
                    row_key = %row_key,
                    table = %self.table_name(),
                    "Inserted entity"
                );
                Ok(())
            }
            Err(err @ StorageError::DuplicateKey { .. }) => {
                warn!(
                    partition_key = %partition_key,
                    row_key = %row_key,
                    table = %self.table_name(),
                    "Entity already exists"
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Insert an entity or replace the stored one. Last writer wins.
    pub async fn insert_or_update(&self, entity: &E) -> Result<()> {
        let record = self.record_of(entity)?;
        let table = self.binding.handle().await?;
        debug!(
            partition_key = %record.partition_key,
            row_key = %record.row_key,
            table = %self.table_name(),
            "Upserting entity"
        );
        table.replace(record).await
    }

    /// Delete by key. Returns whether a record was removed.
    pub async fn delete(&self, partition_key: &str, row_key: &str) -> Result<bool> {
        self.binding.ensure_configured()?;
        let partition_key = normalize_key(partition_key)?;
        let row_key = normalize_key(row_key)?;

        let table = self.binding.handle().await?;
        table.delete(&partition_key, &row_key).await
    }

    /// All entities in a partition, ordered by row key.
    pub async fn query_partition(&self, partition_key: &str) -> Result<Vec<E>> {
        self.binding.ensure_configured()?;
        let partition_key = normalize_key(partition_key)?;

        let table = self.binding.handle().await?;
        table
            .query_partition(&partition_key)
            .await?
            .into_iter()
            .map(|record| unflatten(&record.properties).map_err(StorageError::from))
            .collect()
    }

    fn record_of(&self, entity: &E) -> Result<TableRecord> {
        self.binding.ensure_configured()?;
        let (partition_key, row_key) = self.keys_of(entity)?;
        Ok(TableRecord::new(partition_key, row_key, flatten(entity)?))
    }
}

impl<E> fmt::Debug for TableProxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableProxy")
            .field("table", &self.binding.resource_name())
            .field("connection", &self.binding.connection_name())
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

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "PascalCase")]
    struct Customer {
        region: String,
        id: String,
        name: String,
    }

    fn customer(region: &str, id: &str, name: &str) -> Customer {
        Customer {
            region: region.into(),
            id: id.into(),
            name: name.into(),
        }
    }

    fn proxy(factory: &MemoryAccountFactory) -> TableProxy<Customer> {
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        let env = StorageEnvironment::in_memory(settings, factory);
        TableProxy::new(env, |c: &Customer| c.region.clone(), |c: &Customer| c.id.clone())
            .unwrap()
            .with_connection_name("Storage")
    }

    #[test]
    fn test_default_table_name_is_type_name() {
        let proxy = proxy(&MemoryAccountFactory::new());
        assert_eq!(proxy.table_name(), "customer");
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let factory = MemoryAccountFactory::new();
        let proxy = proxy(&factory);
        proxy.insert(&customer("eu/west", "#42", "Ada")).await.unwrap();

        let (pk, rk) = proxy.keys_of(&customer("eu/west", "#42", "")).unwrap();
        assert_eq!((pk.as_str(), rk.as_str()), ("euwest", "42"));
        let found = proxy.get("eu/west", "#42").await.unwrap().unwrap();
        assert_eq!(found.name, "Ada");
    }

    #[tokio::test]
    async fn test_query_and_delete() {
        let factory = MemoryAccountFactory::new();
        let proxy = proxy(&factory);
        for (id, name) in [("2", "Bo"), ("1", "Al")] {
            proxy.insert(&customer("eu", id, name)).await.unwrap();
        }
        proxy.insert(&customer("us", "1", "Cy")).await.unwrap();

        let names: Vec<_> = proxy
            .query_partition("eu")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Al", "Bo"]);

        assert!(proxy.delete("eu", "1").await.unwrap());
        assert_eq!(proxy.get("eu", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_key_fails_before_network() {
        let factory = MemoryAccountFactory::new();
        let proxy = proxy(&factory);

        let err = proxy.get("///", "1").await.unwrap_err();
        assert!(err.is_invalid_name());
        assert_eq!(factory.stats().total(), 0);
    }

    #[tokio::test]
    async fn test_unmappable_entity_fails_before_network() {
        #[derive(Serialize, Deserialize)]
        struct Tagged {
            id: String,
            tags: Vec<String>,
        }

        let factory = MemoryAccountFactory::new();
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        let env = StorageEnvironment::in_memory(settings, &factory);
        let proxy = TableProxy::<Tagged>::new(env, |t| t.id.clone(), |t| t.id.clone())
            .unwrap()
            .with_connection_name("Storage");

        let err = proxy
            .insert(&Tagged {
                id: "a".into(),
                tags: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Entity(_)));
        assert_eq!(factory.stats().total(), 0);
    }
}
