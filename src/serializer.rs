//! Turning structured records into the bytes the producer publishes.
//!
//! The producer itself only moves bytes; callers encode first and pass the
//! payload and its type tag to [`crate::Producer::produce`].

use serde::Serialize;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationFormat {
    #[default]
    JsonCompact,
    Json,
}

/// A payload ready for `produce`, with the tag it should be sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    pub payload: Vec<u8>,
    pub type_tag: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    format: SerializationFormat,
}

impl JsonSerializer {
    pub fn new(format: SerializationFormat) -> Self {
        Self { format }
    }

    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = match self.format {
            SerializationFormat::JsonCompact => serde_json::to_vec(value)?,
            SerializationFormat::Json => serde_json::to_vec_pretty(value)?,
        };
        Ok(bytes)
    }

    pub fn encode<T: Serialize>(&self, value: &T, type_tag: impl Into<String>) -> Result<EncodedMessage> {
        Ok(EncodedMessage {
            payload: self.serialize(value)?,
            type_tag: type_tag.into(),
        })
    }
}
