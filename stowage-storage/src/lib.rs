//! Typed storage proxies.
//!
//! A proxy binds one resource (a table, a queue or a blob container) to a
//! connection name. The connection name is a settings key holding a storage
//! connection string; it is looked up, connected and the resource opened on
//! the first operation, and the resulting handle is cached until the
//! connection or resource name changes.
//!
//! - [`TableProxy`] stores entities flattened by `stowage-entity`, keyed by
//!   two caller-supplied key functions
//! - [`QueueProxy`] sends messages encoded as XML text
//! - [`BlobProxy`] stores bytes, text or JSON under hierarchical names
//!
//! The remote service sits behind the [`AccountFactory`] trait family.
//! [`MemoryAccountFactory`] implements it in process for tests and local
//! runs.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use stowage_config::ConfigManager;
//! use stowage_storage::{MemoryAccountFactory, StorageEnvironment, TableProxy};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(default, rename_all = "PascalCase")]
//! struct Customer {
//!     region: String,
//!     id: String,
//!     name: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let settings = ConfigManager::new();
//! settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
//! let env = StorageEnvironment::in_memory(settings, &MemoryAccountFactory::new());
//!
//! let customers = TableProxy::<Customer>::new(env, |c| c.region.clone(), |c| c.id.clone())
//!     .unwrap()
//!     .with_connection_name("Storage");
//!
//! let ada = Customer { region: "eu".into(), id: "1".into(), name: "Ada".into() };
//! customers.insert(&ada).await.unwrap();
//! assert_eq!(customers.get("eu", "1").await.unwrap(), Some(ada));
//! # });
//! ```

mod backend;
mod binding;
mod blob;
pub mod codec;
mod connection;
mod environment;
mod error;
mod memory;
mod queue;
mod table;

pub use backend::{
    AccountFactory, BlobItem, ContainerHandle, QueueHandle, QueueMessage, StorageAccount,
    TableHandle, TableRecord,
};
pub use binding::{ContainerResource, ProxyState, QueueResource, ResourceKind, TableResource};
pub use blob::BlobProxy;
pub use connection::{ServiceKind, StorageConnection};
pub use environment::StorageEnvironment;
pub use error::{Result, StorageError};
pub use memory::{MemoryAccount, MemoryAccountFactory, OperationStats};
pub use queue::{Delivery, QueueProxy};
pub use table::TableProxy;
