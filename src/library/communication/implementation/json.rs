//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! This module allows implementors of traits that allow raw access to underlying messaging systems
//! to provide the higher-level traits relying on serialization. It does so by providing a number of
//! marker traits which, when implemented, provide default implementations of the higher-level traits
//! by translating between lower-level serialized data and higher-level strongly typed data by using
//! [`serde_json`]. Exchanging the serialization format only requires changing the marker traits.
//!
//! Values are encoded structurally, keyed by field name, so a receiver only needs to know the
//! type it expects and no shared schema registry.

use super::super::event::{Delivery, Publisher, RawDelivery, RawPublisher};
use super::super::CommunicationError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::type_name;
use tracing::{instrument, trace};

/// Content type attached to every message encoded by this module
pub const CONTENT_TYPE: &str = "application/json";

/// Encodes a value using [`serde_json::to_vec`]
pub fn encode<T>(value: &T) -> Result<Vec<u8>, CommunicationError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value).map_err(|e| CommunicationError::Serialization {
        payload: type_name::<T>(),
        source: e.into(),
    })
}

/// Decodes a value using [`serde_json::from_slice`]
pub fn decode<T>(data: &[u8]) -> Result<T, CommunicationError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(data).map_err(|e| CommunicationError::Deserialization {
        payload: type_name::<T>(),
        source: e.into(),
    })
}

/// Marker trait providing a default [`Publisher`] implementation based on [`serde_json`]
pub trait JsonPublisher: RawPublisher + Send + Sync {}

#[async_trait]
impl<P> Publisher for P
where
    P: JsonPublisher,
{
    /// Serializes the value using [`serde_json::to_vec`]
    #[instrument(err, skip(self, value), fields(payload = type_name::<T>()))]
    async fn publish<T: Serialize + Send + Sync>(
        &self,
        exchange: &str,
        routing_key: &str,
        value: &T,
    ) -> Result<(), CommunicationError> {
        trace!("Serializing message");
        let data = encode(value)?;

        self.publish_raw(exchange, routing_key, &data, CONTENT_TYPE)
            .await
            .map_err(|source| CommunicationError::Publish {
                exchange: exchange.to_owned(),
                routing_key: routing_key.to_owned(),
                source,
            })
    }
}

/// Marker trait providing a default [`Delivery`] implementation based on [`serde_json`]
pub trait JsonDelivery: RawDelivery {}

impl<D> Delivery for D
where
    D: JsonDelivery,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<T>(&self) -> Result<T, CommunicationError>
    where
        T: DeserializeOwned,
    {
        trace!(payload = type_name::<T>(), "Deserializing delivery");
        decode(self.payload())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::EmptyResult;
    use pretty_assertions::assert_eq;
    use serde::ser::{Error, Serializer};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Move {
        participant: String,
        units: Vec<u32>,
        destination: String,
    }

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("value has no wire representation"))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl RawPublisher for RecordingPublisher {
        async fn publish_raw(
            &self,
            _exchange: &str,
            routing_key: &str,
            payload: &[u8],
            content_type: &str,
        ) -> EmptyResult {
            self.sent.lock().unwrap().push((
                routing_key.to_owned(),
                payload.to_vec(),
                content_type.to_owned(),
            ));
            Ok(())
        }
    }

    impl JsonPublisher for RecordingPublisher {}

    #[test]
    fn restore_encoded_values() {
        let value = Move {
            participant: "alice".into(),
            units: vec![1, 2, 3],
            destination: "north".into(),
        };

        let decoded: Move = decode(&encode(&value).unwrap()).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn key_fields_by_name() {
        let encoded = br#"{"destination":"north","units":[],"participant":"alice"}"#;

        let decoded: Move = decode(encoded).unwrap();

        assert_eq!(decoded.participant, "alice");
        assert_eq!(decoded.destination, "north");
    }

    #[test]
    fn reject_shape_mismatch() {
        let result = decode::<Move>(br#"{"paused":true}"#);

        assert!(matches!(
            result,
            Err(CommunicationError::Deserialization { .. })
        ));
    }

    #[test]
    fn reject_malformed_input() {
        let result = decode::<Move>(b"{\"participant\":");

        assert!(matches!(
            result,
            Err(CommunicationError::Deserialization { .. })
        ));
    }

    #[test]
    fn reject_unrepresentable_values() {
        let result = encode(&Unrepresentable);

        assert!(matches!(result, Err(CommunicationError::Serialization { .. })));
    }

    #[test]
    fn reject_non_string_map_keys() {
        let mut value = HashMap::new();
        value.insert(vec![1u8], "tuple keys are not representable");

        assert!(matches!(
            encode(&value),
            Err(CommunicationError::Serialization { .. })
        ));
    }

    #[tokio::test]
    async fn publish_encoded_values_with_content_type() {
        let publisher = RecordingPublisher::default();

        publisher.publish("peril_direct", "pause", &vec![1, 2]).await.unwrap();

        assert_eq!(
            *publisher.sent.lock().unwrap(),
            vec![("pause".to_owned(), b"[1,2]".to_vec(), CONTENT_TYPE.to_owned())]
        );
    }

    #[tokio::test]
    async fn refuse_publishing_unrepresentable_values() {
        let publisher = RecordingPublisher::default();

        let result = publisher
            .publish("peril_direct", "pause", &Unrepresentable)
            .await;

        match result {
            Err(CommunicationError::Serialization { payload, .. }) => {
                assert!(payload.ends_with("Unrepresentable"));
            }
            other => panic!("expected a serialization error, got {:?}", other),
        }
        assert!(publisher.sent.lock().unwrap().is_empty());
    }
}
