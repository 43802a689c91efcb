use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Serializes a value to payload bytes using bincode.
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Corrupt(format!("value encoding failed: {e}")))
}

/// Deserializes a value from payload bytes using bincode.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Corrupt(format!("value decoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestStruct {
        id: u32,
        name: String,
        active: bool,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestStruct {
            id: 42,
            name: "test".to_string(),
            active: true,
        };

        let serialized = serialize(&original).unwrap();
        let deserialized: TestStruct = deserialize(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_invalid_data() {
        let invalid = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<String> = deserialize(&invalid);
        assert!(result.is_err());
    }
}
