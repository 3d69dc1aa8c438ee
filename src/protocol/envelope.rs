use core::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Join,
    Leave,
    Operation,
    Cursor,
    Presence,
    Sync,
    Welcome,
    FileChange,
    Error,
    Ack,
}

impl Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MessageType::Join => "join",
            MessageType::Leave => "leave",
            MessageType::Operation => "operation",
            MessageType::Cursor => "cursor",
            MessageType::Presence => "presence",
            MessageType::Sync => "sync",
            MessageType::Welcome => "welcome",
            MessageType::FileChange => "file_change",
            MessageType::Error => "error",
            MessageType::Ack => "ack",
        })
    }
}

/// The JSON frame every message travels in: `{type, data, userId?, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn wrap<T: Serialize>(
        message_type: MessageType,
        data: &T,
        user_id: Option<String>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            message_type,
            data: serde_json::to_value(data)?,
            user_id,
            timestamp: Utc::now(),
        })
    }

    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> { Ok(serde_json::from_str(text)?) }

    pub fn encode(&self) -> Result<String, ProtocolError> { Ok(serde_json::to_string(self)?) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_message_type_names_match_serde() {
        for message_type in [
            MessageType::Join,
            MessageType::Leave,
            MessageType::Operation,
            MessageType::Cursor,
            MessageType::Presence,
            MessageType::Sync,
            MessageType::Welcome,
            MessageType::FileChange,
            MessageType::Error,
            MessageType::Ack,
        ] {
            assert_eq!(
                serde_json::to_string(&message_type).unwrap(),
                format!("\"{message_type}\"")
            );
        }
    }

    #[test]
    fn test_missing_optional_fields() {
        let envelope = Envelope::decode(r#"{"type":"welcome"}"#).unwrap();

        assert_eq!(envelope.message_type, MessageType::Welcome);
        assert_eq!(envelope.data, serde_json::Value::Null);
        assert_eq!(envelope.user_id, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(Envelope::decode(r#"{"type":"chat","data":{}}"#).is_err());
        assert!(Envelope::decode("not json").is_err());
    }
}
