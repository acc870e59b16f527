// Stowage - typed access to blob, queue and table storage
//
// This library canonicalizes resource names, flattens nested entities into
// table properties and exposes lazily-resolved storage proxies.

// Re-export member crates
pub use stowage_config as config;
pub use stowage_entity as entity;
pub use stowage_naming as naming;
pub use stowage_storage as storage;

#[cfg(feature = "tablelog")]
pub use stowage_tablelog as tablelog;

// Re-export the most used items at the root
pub use stowage_config::{ConfigManager, SettingsBuilder};
pub use stowage_entity::{PropertyMap, PropertyValue, flatten, unflatten};
pub use stowage_naming::{
    IdentifierKind, NamingError, normalize_flat_identifier, normalize_hierarchical_path,
    normalize_key,
};
pub use stowage_storage::{
    BlobProxy, MemoryAccountFactory, ProxyState, QueueProxy, StorageConnection,
    StorageEnvironment, StorageError, TableProxy,
};

#[cfg(feature = "tablelog")]
pub use stowage_tablelog::{LoggerConfiguration, TableLogger};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BlobProxy,
        ConfigManager,
        IdentifierKind,
        MemoryAccountFactory,
        PropertyMap,
        PropertyValue,
        ProxyState,
        QueueProxy,
        SettingsBuilder,
        StorageEnvironment,
        StorageError,
        TableProxy,
        flatten,
        normalize_flat_identifier,
        normalize_hierarchical_path,
        normalize_key,
        unflatten,
    };

    #[cfg(feature = "tablelog")]
    pub use crate::TableLogger;
}
