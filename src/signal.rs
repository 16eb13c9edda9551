use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Envelope relayed between peers of a room.
///
/// `data` is carried through untouched; the relay never looks inside it.
/// A missing (or empty) `to` means the message is broadcast to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

/// Any value that is present, `null` included, is kept; only an absent field is `None`.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl SignalMessage {
    /// Treats `"to": ""` the same as an absent recipient.
    pub fn normalized(mut self) -> Self {
        if self.to.as_deref().is_some_and(str::is_empty) {
            self.to = None;
        }
        self
    }

    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Name of the first required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.code.is_empty() {
            Some("code")
        } else if self.from.is_empty() {
            Some("from")
        } else if self.kind.is_empty() {
            Some("type")
        } else {
            None
        }
    }
}
