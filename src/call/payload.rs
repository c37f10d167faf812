use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tag identifying which reply type a completed call carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    QueryCompleted,
    ItemCreated,
    ItemUpdateSubmitted,
    ItemDeleted,
}

/// Error when encoding or decoding a reply payload.
#[derive(Debug, thiserror::Error)]
#[error("payload error: {0}")]
pub struct PayloadError(#[from] bitcode::Error);

/// A reply type that can travel through the transport's result buffer.
pub trait CallPayload: Serialize + DeserializeOwned {
    const KIND: CallKind;

    fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(bitcode::serialize(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(bitcode::deserialize(bytes)?)
    }
}
