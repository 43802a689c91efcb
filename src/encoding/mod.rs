pub mod bincode;
pub mod keycode;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Values stored through the typed store API, encoded with bincode.
///
/// Record payloads are opaque bytes as far as the store core is
/// concerned; this trait is the thin shell that turns language-level
/// values into those bytes and back.
pub trait Value: Serialize + DeserializeOwned {
    /// Encode the value to payload bytes.
    fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
    }

    /// Decode payload bytes back into the value.
    fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
    }
}

impl<T> Value for T where T: Serialize + DeserializeOwned {}
