//! The `{"emit": [tag, fields]}` wire envelope.
//!
//! Every frame a node sends is a JSON object with a single meaningful
//! key, `"emit"`, holding a two-element array: a string tag and an
//! object of named payloads. Payloads stay undecoded ([`RawValue`])
//! until a consumer asks for a specific field with a concrete type, so
//! the collector never pays for fields it does not read.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;

/// Acknowledgement written once after a successful `hello` handshake.
pub const READY_FRAME: &str = r#"{"emit":["ready"]}"#;

/// Acknowledgement written in response to each `node-ping`.
pub const PONG_FRAME: &str = r#"{"emit":["node-pong",{}]}"#;

/// Errors produced by the envelope codec.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The frame is not a JSON object carrying an `emit` array.
    #[error("invalid frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),

    /// The `emit` array does not hold exactly two elements.
    #[error("expected 2 emit elements, got {0}")]
    EmitArity(usize),

    /// The first `emit` element is not a string.
    #[error("invalid type tag: {0}")]
    InvalidTag(#[source] serde_json::Error),

    /// The type tag is the empty string.
    #[error("empty type tag")]
    EmptyTag,

    /// The second `emit` element is not an object.
    #[error("invalid fields object: {0}")]
    InvalidFields(#[source] serde_json::Error),

    /// A requested field is absent from the envelope.
    #[error("field {0:?} not found")]
    FieldNotFound(String),

    /// A field payload does not parse as the requested type.
    #[error("failed to decode field {name:?}: {source}")]
    FieldDecode {
        /// The field that failed to decode.
        name: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Serialization back to wire form failed.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A decoded wire frame: a type tag plus named, still-raw payloads.
///
/// Cloning deep-copies every payload; a clone mutated through
/// [`Envelope::set_field`] never aliases the original. This is how the
/// collector substitutes the outbound relay secret without touching
/// the envelope seen by local handlers.
#[derive(Debug, Clone)]
pub struct Envelope {
    tag: String,
    fields: BTreeMap<String, Box<RawValue>>,
}

impl Envelope {
    /// Decode a raw text frame.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        #[derive(Deserialize)]
        struct WireFrame<'a> {
            #[serde(borrow)]
            emit: Vec<&'a RawValue>,
        }

        let frame: WireFrame<'_> =
            serde_json::from_str(raw).map_err(EnvelopeError::InvalidFrame)?;
        if frame.emit.len() != 2 {
            return Err(EnvelopeError::EmitArity(frame.emit.len()));
        }

        let tag: String =
            serde_json::from_str(frame.emit[0].get()).map_err(EnvelopeError::InvalidTag)?;
        if tag.is_empty() {
            return Err(EnvelopeError::EmptyTag);
        }

        let fields: BTreeMap<String, Box<RawValue>> =
            serde_json::from_str(frame.emit[1].get()).map_err(EnvelopeError::InvalidFields)?;

        Ok(Self { tag, fields })
    }

    /// The frame's type tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether a named field is present.
    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Decode one named payload as `T`.
    pub fn decode_field<T: DeserializeOwned>(&self, name: &str) -> Result<T, EnvelopeError> {
        let raw = self
            .fields
            .get(name)
            .ok_or_else(|| EnvelopeError::FieldNotFound(name.to_owned()))?;
        serde_json::from_str(raw.get()).map_err(|source| EnvelopeError::FieldDecode {
            name: name.to_owned(),
            source,
        })
    }

    /// Replace (or insert) one named payload with a serialized value.
    pub fn set_field<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), EnvelopeError> {
        let raw = serde_json::value::to_raw_value(value).map_err(EnvelopeError::Encode)?;
        let _ = self.fields.insert(name.to_owned(), raw);
        Ok(())
    }

    /// Serialize back to wire form.
    ///
    /// Round-trips any decoded envelope byte-for-byte up to key and
    /// whitespace ordering; payloads are emitted verbatim.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(EnvelopeError::Encode)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("emit", &(&self.tag, &self.fields))?;
        map.end()
    }
}
