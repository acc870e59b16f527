//! Queue message wire format.
//!
//! Messages travel as XML text: the root element is named after the message
//! type and every member becomes a child element.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Result, StorageError};

/// Encode a message body.
pub fn encode<M: Serialize>(message: &M) -> Result<String> {
    quick_xml::se::to_string(message).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode a message body produced by [`encode`].
pub fn decode<M: DeserializeOwned>(body: &str) -> Result<M> {
    quick_xml::de::from_str(body).map_err(|e| StorageError::MalformedMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        order_id: u64,
        customer: String,
        total: f64,
    }

    #[test]
    fn test_encode_uses_type_name_as_root() {
        let body = encode(&OrderPlaced {
            order_id: 7,
            customer: "Ada".into(),
            total: 12.5,
        })
        .unwrap();

        assert_eq!(
            body,
            "<OrderPlaced><order_id>7</order_id><customer>Ada</customer><total>12.5</total></OrderPlaced>"
        );
    }

    #[test]
    fn test_decode_encoded_body() {
        let message = OrderPlaced {
            order_id: 1,
            customer: "Bo & Co <ltd>".into(),
            total: 0.0,
        };
        let decoded: OrderPlaced = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode::<OrderPlaced>("<OrderPlaced><order_id>seven").unwrap_err();
        assert!(err.is_malformed_message());
        let err = decode::<OrderPlaced>("<OrderPlaced><order_id>x</order_id></OrderPlaced>").unwrap_err();
        assert!(err.is_malformed_message());
    }
}
