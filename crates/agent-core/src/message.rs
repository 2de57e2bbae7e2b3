//! Queue wire types for inbound requests and outbound responses.
//!
//! Both directions are camelCase JSON. Inbound decoding accepts any JSON
//! object: a field that is absent, `null` or of an unexpected type falls back
//! to its default, and missing identifiers become [`UNKNOWN`]. Timestamps are
//! carried through untyped. Only bodies that are not a JSON object fail.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Error code carried by responses built from a failed invocation.
pub const PROCESSING_ERROR: &str = "PROCESSING_ERROR";

/// Stand-in for a `messageId` or `remoteJid` the producer left out.
pub const UNKNOWN: &str = "unknown";

/// A conversational request consumed from the inbound queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    /// Unique per inbound message.
    #[serde(default = "unknown", deserialize_with = "lenient_id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub contact: Contact,
    #[serde(default, deserialize_with = "lenient")]
    pub message: MessageBody,
    #[serde(default, deserialize_with = "lenient")]
    pub context: ConversationContext,
}

impl InboundRequest {
    /// Decode a raw delivery body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The conversation key used for session routing.
    pub fn remote_jid(&self) -> &str {
        &self.contact.remote_jid
    }
}

/// The sender of an inbound request. Echoed back verbatim on the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Unique conversation key.
    #[serde(default = "unknown", deserialize_with = "lenient_id")]
    pub remote_jid: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone_number: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
}

impl Default for Contact {
    fn default() -> Self {
        Self::new(UNKNOWN)
    }
}

impl Contact {
    pub fn new(remote_jid: impl Into<String>) -> Self {
        Self {
            remote_jid: remote_jid.into(),
            phone_number: None,
            name: None,
        }
    }

    /// Display name, or "User" when the producer did not send one.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("User")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(
        rename = "type",
        default = "default_message_type",
        deserialize_with = "lenient_message_type"
    )]
    pub kind: String,
}

impl Default for MessageBody {
    fn default() -> Self {
        Self {
            text: String::new(),
            timestamp: None,
            kind: default_message_type(),
        }
    }
}

fn default_message_type() -> String {
    "text".to_string()
}

/// Context supplied by the producer alongside the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub user_notes: Option<String>,
    /// Entries that are not objects are dropped.
    #[serde(default, deserialize_with = "lenient_history")]
    pub conversation_history: Vec<HistoryEntry>,
}

/// One prior turn, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Strings pass through, numbers and booleans are rendered, anything else is absent.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(unknown))
}

fn lenient_message_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(default_message_type))
}

/// Decode a nested object, falling back to its default when it has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_history<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<HistoryEntry>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// A reply published to the outbound queue.
///
/// Exactly one is produced for every inbound request that decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundResponse {
    /// Always `"resp-" + original_message_id`.
    pub message_id: String,
    pub original_message_id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub status: ResponseStatus,
    pub contact: Contact,
    pub response: ResponseBody,
    pub agent_metadata: AgentMetadata,
    pub error: Option<ResponseError>,
}

impl OutboundResponse {
    /// Derive the outbound message id from the inbound one.
    pub fn response_id(original_message_id: &str) -> String {
        format!("resp-{}", original_message_id)
    }

    /// Build a successful response to `request`.
    pub fn success(
        request: &InboundRequest,
        text: impl Into<String>,
        metadata: AgentMetadata,
    ) -> Self {
        Self {
            message_id: Self::response_id(&request.message_id),
            original_message_id: request.message_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            status: ResponseStatus::Success,
            contact: request.contact.clone(),
            response: ResponseBody::text(text),
            agent_metadata: metadata,
            error: None,
        }
    }

    /// Build an error response to `request`, carrying a human-readable apology.
    pub fn failure(
        request: &InboundRequest,
        apology: impl Into<String>,
        error_message: impl Into<String>,
        metadata: AgentMetadata,
    ) -> Self {
        Self {
            message_id: Self::response_id(&request.message_id),
            original_message_id: request.message_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            status: ResponseStatus::Error,
            contact: request.contact.clone(),
            response: ResponseBody::text(apology),
            agent_metadata: metadata,
            error: Some(ResponseError {
                code: PROCESSING_ERROR.to_string(),
                message: error_message.into(),
                stack: None,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attachments: Vec<serde_json::Value>,
}

impl ResponseBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: "text".to_string(),
            attachments: Vec::new(),
        }
    }
}

/// Details about how the reply was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    pub session_id: String,
    pub tools_used: Vec<String>,
    pub reasoning_steps: Vec<String>,
    /// Seconds spent between decode and response construction.
    pub processing_time: f64,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    pub code: String,
    pub message: String,
    pub stack: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_request() -> serde_json::Value {
        json!({
            "messageId": "test-msg-1",
            "timestamp": 1700000000,
            "contact": {
                "remoteJid": "1234567890@s.whatsapp.net",
                "phoneNumber": "+1234567890",
                "name": "Test User"
            },
            "message": {
                "text": "I would like to make a booking for tomorrow at 2pm",
                "timestamp": 1700000000,
                "type": "text"
            },
            "context": {
                "userNotes": "VIP customer",
                "conversationHistory": [
                    {"role": "user", "content": "What are your available times?", "timestamp": 1699999700},
                    {"role": "assistant", "content": "What day works best?", "timestamp": 1699999760}
                ]
            }
        })
    }

    #[test]
    fn test_decode_full_request() {
        let body = serde_json::to_vec(&full_request()).unwrap();
        let request = InboundRequest::from_slice(&body).unwrap();

        assert_eq!(request.message_id, "test-msg-1");
        assert_eq!(request.remote_jid(), "1234567890@s.whatsapp.net");
        assert_eq!(request.contact.display_name(), "Test User");
        assert_eq!(request.message.kind, "text");
        assert_eq!(request.context.user_notes.as_deref(), Some("VIP customer"));
        assert_eq!(request.context.conversation_history.len(), 2);
        assert_eq!(request.context.conversation_history[1].role, "assistant");
    }

    #[test]
    fn test_decode_minimal_request() {
        let body = br#"{"messageId":"m1","contact":{"remoteJid":"+111@x"},"message":{"text":"book a table"}}"#;
        let request = InboundRequest::from_slice(body).unwrap();

        assert_eq!(request.message.text, "book a table");
        assert_eq!(request.message.kind, "text");
        assert_eq!(request.contact.display_name(), "User");
        assert!(request.context.conversation_history.is_empty());
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(InboundRequest::from_slice(b"not json at all").is_err());
        assert!(InboundRequest::from_slice(&[0xff, 0xfe, 0x00]).is_err());
        assert!(InboundRequest::from_slice(b"[1, 2]").is_err());
        assert!(InboundRequest::from_slice(b"42").is_err());
        assert!(InboundRequest::from_slice(b"").is_err());
    }

    #[test]
    fn test_decode_missing_identifiers() {
        let request = InboundRequest::from_slice(br#"{"message":{"text":"hi"}}"#).unwrap();
        assert_eq!(request.message_id, UNKNOWN);
        assert_eq!(request.remote_jid(), UNKNOWN);

        let request = InboundRequest::from_slice(br#"{"messageId":"m1","contact":{"name":"Ann"}}"#).unwrap();
        assert_eq!(request.message_id, "m1");
        assert_eq!(request.remote_jid(), UNKNOWN);
        assert_eq!(request.contact.display_name(), "Ann");
    }

    #[test]
    fn test_decode_untyped_timestamps() {
        let body = json!({
            "messageId": "m1",
            "timestamp": "2024-01-01T00:00:00Z",
            "contact": {"remoteJid": "+111@x"},
            "message": {"text": "hi", "timestamp": 1700000000.5},
            "context": {
                "conversationHistory": [{"role": "user", "content": "hello", "timestamp": null}]
            }
        });
        let request = InboundRequest::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();

        assert_eq!(request.timestamp, Some(json!("2024-01-01T00:00:00Z")));
        assert_eq!(request.message.timestamp, Some(json!(1700000000.5)));
        assert_eq!(request.context.conversation_history[0].timestamp, None);
    }

    #[test]
    fn test_decode_nulls_and_odd_types() {
        let body = json!({
            "messageId": 17,
            "contact": {"remoteJid": "+111@x", "name": null, "phoneNumber": 15550100},
            "message": {"text": null, "type": null},
            "context": {
                "userNotes": null,
                "conversationHistory": [
                    "stray",
                    {"role": "assistant", "content": null},
                    {"role": "user", "content": "still here"}
                ]
            }
        });
        let request = InboundRequest::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();

        assert_eq!(request.message_id, "17");
        assert_eq!(request.contact.display_name(), "User");
        assert_eq!(request.contact.phone_number.as_deref(), Some("15550100"));
        assert_eq!(request.message.text, "");
        assert_eq!(request.message.kind, "text");
        assert!(request.context.user_notes.is_none());

        let history = &request.context.conversation_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "");
        assert_eq!(history[1].content, "still here");
    }

    #[test]
    fn test_decode_null_sections() {
        let body = br#"{"messageId":"m1","contact":null,"message":"hi","context":{"conversationHistory":null}}"#;
        let request = InboundRequest::from_slice(body).unwrap();

        assert_eq!(request.remote_jid(), UNKNOWN);
        assert_eq!(request.message, MessageBody::default());
        assert!(request.context.conversation_history.is_empty());
    }

    #[test]
    fn test_success_response_shape() {
        let body = br#"{"messageId":"m1","contact":{"remoteJid":"+111@x"},"message":{"text":"hi"}}"#;
        let request = InboundRequest::from_slice(body).unwrap();
        let response = OutboundResponse::success(
            &request,
            "Booked!",
            AgentMetadata {
                session_id: "+111@x".to_string(),
                model: "gpt-4o-mini".to_string(),
                ..Default::default()
            },
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["messageId"], "resp-m1");
        assert_eq!(value["originalMessageId"], "m1");
        assert_eq!(value["status"], "success");
        assert_eq!(value["contact"]["remoteJid"], "+111@x");
        assert_eq!(value["response"]["text"], "Booked!");
        assert_eq!(value["response"]["type"], "text");
        assert_eq!(value["response"]["attachments"], json!([]));
        assert_eq!(value["agentMetadata"]["sessionId"], "+111@x");
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_failure_response_carries_error_code() {
        let body = br#"{"messageId":"m1","contact":{"remoteJid":"+111@x"}}"#;
        let request = InboundRequest::from_slice(body).unwrap();
        let response = OutboundResponse::failure(
            &request,
            "Sorry",
            "agent unavailable: boom",
            AgentMetadata::default(),
        );

        assert!(!response.is_success());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"], PROCESSING_ERROR);
        assert_eq!(value["error"]["message"], "agent unavailable: boom");
        assert!(value["error"]["stack"].is_null());
    }
}
