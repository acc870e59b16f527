//! End-to-end behaviour of the table and queue proxies against the
//! in-memory account.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stowage_config::ConfigManager;
use stowage_storage::{
    MemoryAccountFactory, ProxyState, QueueProxy, StorageEnvironment, StorageError, TableProxy,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Contact {
    contact_id: String,
    display_name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Message {
    mailbox: String,
    message_id: String,
    subject: String,
    from: Option<Contact>,
    to: Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MailArrived {
    mailbox: String,
    message_id: String,
}

fn settings() -> ConfigManager {
    let settings = ConfigManager::new();
    settings
        .set("MailStorage", "UseDevelopmentStorage=true")
        .unwrap();
    settings
}

fn message(id: &str, subject: &str) -> Message {
    Message {
        mailbox: "inbox".into(),
        message_id: id.into(),
        subject: subject.into(),
        from: Some(Contact {
            contact_id: "A".into(),
            display_name: "Ann".into(),
        }),
        to: Contact {
            contact_id: "B".into(),
            display_name: "Bob".into(),
        },
    }
}

fn messages(env: StorageEnvironment) -> TableProxy<Message> {
    TableProxy::new(env, |m: &Message| m.mailbox.clone(), |m: &Message| m.message_id.clone())
        .unwrap()
}

#[tokio::test]
async fn test_unconfigured_table_fails_every_operation_without_network() {
    let factory = MemoryAccountFactory::new();
    let table = messages(StorageEnvironment::in_memory(settings(), &factory));
    assert_eq!(table.state(), ProxyState::Unconfigured);

    let results = [
        table.get("inbox", "1").await.map(|_| ()),
        table.insert(&message("1", "hi")).await,
        table.insert_or_update(&message("1", "hi")).await,
        table.delete("inbox", "1").await.map(|_| ()),
        table.query_partition("inbox").await.map(|_| ()),
    ];
    for result in results {
        assert!(matches!(result, Err(StorageError::NotConfigured(_))));
    }

    // Key validation happens after the configuration check.
    assert!(table.get("", "").await.unwrap_err().is_not_configured());
    assert_eq!(factory.stats().total(), 0);
}

#[tokio::test]
async fn test_missing_connection_setting_is_not_configured() {
    let factory = MemoryAccountFactory::new();
    let table = messages(StorageEnvironment::in_memory(ConfigManager::new(), &factory))
        .with_connection_name("MailStorage");

    let err = table.get("inbox", "1").await.unwrap_err();
    assert!(err.is_not_configured());
    assert_eq!(factory.stats().total(), 0);
}

#[tokio::test]
async fn test_duplicate_insert_then_upsert() {
    let factory = MemoryAccountFactory::new();
    let table =
        messages(StorageEnvironment::in_memory(settings(), &factory)).with_connection_name("MailStorage");

    table.insert(&message("1", "first")).await.unwrap();
    let err = table.insert(&message("1", "second")).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::DuplicateKey { ref partition_key, ref row_key }
            if partition_key == "inbox" && row_key == "1"
    ));

    table.insert_or_update(&message("1", "second")).await.unwrap();
    let stored = table.get("inbox", "1").await.unwrap().unwrap();
    assert_eq!(stored.subject, "second");
    assert_eq!(stored, message("1", "second"));

    assert_eq!(table.get("inbox", "missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_client_is_resolved_once_and_reset_on_reconfiguration() {
    let factory = MemoryAccountFactory::new();
    let mut table =
        messages(StorageEnvironment::in_memory(settings(), &factory)).with_connection_name("MailStorage");
    assert_eq!(table.table_name(), "message");
    assert_eq!(table.state(), ProxyState::Unresolved);

    table.insert(&message("1", "a")).await.unwrap();
    table.insert(&message("2", "b")).await.unwrap();
    assert_eq!(table.state(), ProxyState::Resolved);
    assert_eq!(factory.stats().connects(), 1);

    table.set_table_name("Archived Messages").unwrap();
    assert_eq!(table.table_name(), "archivedmessages");
    assert_eq!(table.state(), ProxyState::Unresolved);
    assert_eq!(table.get("inbox", "1").await.unwrap(), None);
    assert_eq!(factory.stats().connects(), 2);

    table.set_connection_name("MailStorage");
    assert_eq!(table.state(), ProxyState::Unresolved);
}

#[tokio::test]
async fn test_proxies_sharing_a_connection_see_the_same_data() {
    let factory = MemoryAccountFactory::new();
    let env = StorageEnvironment::in_memory(settings(), &factory);
    let writer = messages(env.clone()).with_connection_name("MailStorage");
    let reader = messages(env).with_connection_name("MailStorage");

    writer.insert(&message("7", "shared")).await.unwrap();
    let seen = reader.get("inbox", "7").await.unwrap().unwrap();
    assert_eq!(seen.subject, "shared");
}

#[tokio::test]
async fn test_queue_round_trip_and_malformed_payload() {
    let factory = MemoryAccountFactory::new();
    let queue = QueueProxy::<MailArrived>::new(StorageEnvironment::in_memory(settings(), &factory))
        .unwrap()
        .with_connection_name("MailStorage");
    assert_eq!(queue.queue_name(), "mailarrived");

    let event = MailArrived {
        mailbox: "inbox".into(),
        message_id: "1".into(),
    };
    let envelope = queue.enqueue(&event).await.unwrap();
    assert_eq!(queue.decode(&envelope.body).unwrap(), event);

    let delivery = queue.dequeue(Duration::from_secs(30)).await.unwrap().unwrap();
    assert_eq!(delivery.message, event);
    queue.complete(&delivery).await.unwrap();
    assert_eq!(queue.approximate_len().await.unwrap(), 0);

    assert!(queue.decode("{\"mailbox\":\"inbox\"}").unwrap_err().is_malformed_message());
}

#[tokio::test]
async fn test_unconfigured_queue_never_connects() {
    let factory = MemoryAccountFactory::new();
    let queue =
        QueueProxy::<MailArrived>::new(StorageEnvironment::in_memory(settings(), &factory)).unwrap();

    let event = MailArrived {
        mailbox: "inbox".into(),
        message_id: "1".into(),
    };
    assert!(queue.enqueue(&event).await.unwrap_err().is_not_configured());
    assert!(queue.peek().await.unwrap_err().is_not_configured());
    assert!(
        queue
            .dequeue(Duration::from_secs(1))
            .await
            .unwrap_err()
            .is_not_configured()
    );
    assert_eq!(factory.stats().total(), 0);
}
