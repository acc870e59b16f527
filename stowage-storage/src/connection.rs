//! Storage account connection strings.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{Result, StorageError};

/// Storage service within an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Blob containers.
    Blob,
    /// Message queues.
    Queue,
    /// Tables.
    Table,
}

impl ServiceKind {
    fn subdomain(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Queue => "queue",
            Self::Table => "table",
        }
    }

    fn development_port(&self) -> u16 {
        match self {
            Self::Blob => 10000,
            Self::Queue => 10001,
            Self::Table => 10002,
        }
    }
}

/// Parsed storage account connection string.
///
/// Accepts the usual `Key=Value;Key=Value` form with `AccountName`,
/// `AccountKey`, `DefaultEndpointsProtocol`, `EndpointSuffix` and explicit
/// `BlobEndpoint` / `QueueEndpoint` / `TableEndpoint` overrides, plus the
/// `UseDevelopmentStorage=true` shortcut for the local emulator. Keys are
/// matched case-insensitively and unknown keys are ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConnection {
    account_name: String,
    account_key: Option<String>,
    protocol: String,
    endpoint_suffix: String,
    endpoints: HashMap<ServiceKind, String>,
    development: bool,
}

impl StorageConnection {
    /// Account name of the local storage emulator.
    pub const DEVELOPMENT_ACCOUNT: &'static str = "devstoreaccount1";

    /// Published key of the local storage emulator.
    pub const DEVELOPMENT_KEY: &'static str =
        "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

    const DEFAULT_PROTOCOL: &'static str = "https";
    const DEFAULT_SUFFIX: &'static str = "core.windows.net";

    /// Connection to the local storage emulator.
    pub fn development() -> Self {
        let account = Self::DEVELOPMENT_ACCOUNT;
        let endpoints = [ServiceKind::Blob, ServiceKind::Queue, ServiceKind::Table]
            .into_iter()
            .map(|kind| {
                let url = format!("http://127.0.0.1:{}/{}", kind.development_port(), account);
                (kind, url)
            })
            .collect();

        Self {
            account_name: account.to_string(),
            account_key: Some(Self::DEVELOPMENT_KEY.to_string()),
            protocol: "http".to_string(),
            endpoint_suffix: String::new(),
            endpoints,
            development: true,
        }
    }

    /// Parse a connection string.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = HashMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                StorageError::InvalidConnectionString(format!("segment '{}' has no value", segment))
            })?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if pairs
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self::development());
        }

        let account_name = pairs
            .remove("accountname")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StorageError::InvalidConnectionString("missing AccountName".into()))?;

        let account_key = pairs.remove("accountkey");
        if let Some(key) = &account_key {
            STANDARD.decode(key).map_err(|_| {
                StorageError::InvalidConnectionString("AccountKey is not valid base64".into())
            })?;
        }

        let protocol = pairs
            .remove("defaultendpointsprotocol")
            .unwrap_or_else(|| Self::DEFAULT_PROTOCOL.to_string());
        let endpoint_suffix = pairs
            .remove("endpointsuffix")
            .unwrap_or_else(|| Self::DEFAULT_SUFFIX.to_string());

        let mut endpoints = HashMap::new();
        for (kind, key) in [
            (ServiceKind::Blob, "blobendpoint"),
            (ServiceKind::Queue, "queueendpoint"),
            (ServiceKind::Table, "tableendpoint"),
        ] {
            let url = pairs.remove(key).unwrap_or_else(|| {
                format!("{}://{}.{}.{}", protocol, account_name, kind.subdomain(), endpoint_suffix)
            });
            endpoints.insert(kind, url);
        }

        Ok(Self {
            account_name,
            account_key,
            protocol,
            endpoint_suffix,
            endpoints,
            development: false,
        })
    }

    /// Storage account name.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Base64 account key, if present.
    pub fn account_key(&self) -> Option<&str> {
        self.account_key.as_deref()
    }

    /// Endpoint protocol (`https` unless overridden).
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Endpoint DNS suffix.
    pub fn endpoint_suffix(&self) -> &str {
        &self.endpoint_suffix
    }

    /// Service endpoint URL.
    pub fn endpoint(&self, kind: ServiceKind) -> &str {
        self.endpoints.get(&kind).map(String::as_str).unwrap_or_default()
    }

    /// Whether this targets the local emulator.
    pub fn is_development(&self) -> bool {
        self.development
    }
}

impl FromStr for StorageConnection {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for StorageConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConnection")
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("protocol", &self.protocol)
            .field("endpoints", &self.endpoints)
            .field("development", &self.development)
            .finish()
    }
}
