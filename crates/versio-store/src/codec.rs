//! Binary encoding of version batches.

use serde::de::DeserializeOwned;
use serde::Serialize;

use versio_types::Version;

use crate::error::{StoreError, StoreResult};

/// Encode a batch of versions to bincode bytes.
pub fn encode_versions<K, V, M>(versions: &[Version<K, V, M>]) -> StoreResult<Vec<u8>>
where
    K: Serialize,
    V: Serialize,
    M: Serialize,
{
    bincode::serialize(versions).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a batch of versions produced by [`encode_versions`].
pub fn decode_versions<K, V, M>(data: &[u8]) -> StoreResult<Vec<Version<K, V, M>>>
where
    K: Ord + DeserializeOwned,
    V: DeserializeOwned,
    M: DeserializeOwned,
{
    bincode::deserialize(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use versio_path::{PropertyPath, PropertyValue};
    use versio_types::Revision;

    type DocVersion = Version<PropertyPath, PropertyValue, String>;

    fn make_history() -> Vec<DocVersion> {
        let name: PropertyPath = "name".parse().unwrap();
        let tags: PropertyPath = "tags".parse().unwrap();
        vec![
            Version::builder(Revision::new(1, 7))
                .set(PropertyPath::root(), PropertyValue::Associative)
                .set(name.clone(), "Lamp")
                .set(tags, PropertyValue::Sequence(0))
                .meta("created".to_string())
                .build(),
            Version::builder(Revision::new(2, 7))
                .parent(Revision::new(1, 7))
                .branch("feature")
                .reset()
                .set(name, PropertyValue::from(1.5))
                .remove("tags".parse::<PropertyPath>().unwrap())
                .meta("reset".to_string())
                .build(),
        ]
    }

    #[test]
    fn document_versions_survive_encoding() {
        let history = make_history();
        let bytes = encode_versions(&history).unwrap();
        let decoded: Vec<DocVersion> = decode_versions(&bytes).unwrap();
        assert_eq!(decoded, history);
    }

    #[test]
    fn truncated_input_is_a_serialization_error() {
        let bytes = encode_versions(&make_history()).unwrap();
        let err = decode_versions::<PropertyPath, PropertyValue, String>(&bytes[..bytes.len() / 2])
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn empty_batch_encodes() {
        let bytes = encode_versions::<String, String, ()>(&[]).unwrap();
        assert!(decode_versions::<String, String, ()>(&bytes).unwrap().is_empty());
    }
}
