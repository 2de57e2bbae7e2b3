//! Agent event shapes and best-effort reply extraction.
//!
//! Agent runners emit a finite stream of heterogeneous events. Adapters map
//! whatever their provider sends into [`AgentEvent`] and call
//! [`extract_reply`]; nothing outside the adapter inspects these shapes.

use tracing::debug;

use crate::trait_def::AgentReply;

/// Reply used when no event carried extractable text.
pub const FALLBACK_REPLY: &str = "I processed your request successfully.";

/// One part of a content event.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    FunctionCall { name: String },
    /// A part kind the worker has no use for (inline data, thoughts, ...).
    Other,
}

/// The closed set of event shapes an adapter may translate into.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Model content split into parts.
    Content { parts: Vec<ContentPart> },
    /// A structured payload with a direct text field.
    Data { text: String },
    /// A tool invocation outside of a content event.
    ToolCall { name: String },
    /// Provider token accounting.
    Usage { total_tokens: u32 },
    /// Anything else, in its printed form.
    Raw(String),
}

/// Collapse a sequence of events into a single reply.
///
/// Text parts of content events are concatenated in order. A data event or a
/// raw event replaces whatever was collected so far, mirroring a runner whose
/// last non-content event is its final answer. When nothing usable is found
/// the reply text is [`FALLBACK_REPLY`].
pub fn extract_reply<I>(events: I) -> AgentReply
where
    I: IntoIterator<Item = AgentEvent>,
{
    let mut text = String::new();
    let mut tools_used = Vec::new();
    let mut tokens_used = None;

    for event in events {
        match event {
            AgentEvent::Content { parts } => {
                for part in parts {
                    match part {
                        ContentPart::Text(t) => text.push_str(&t),
                        ContentPart::FunctionCall { name } => tools_used.push(name),
                        ContentPart::Other => {}
                    }
                }
            }
            AgentEvent::Data { text: data } => text = data,
            AgentEvent::ToolCall { name } => tools_used.push(name),
            AgentEvent::Usage { total_tokens } => {
                tokens_used = Some(tokens_used.unwrap_or(0) + total_tokens);
            }
            AgentEvent::Raw(raw) => match quoted_text(&raw) {
                Some(quoted) => text = quoted.to_string(),
                None if raw != "None" => text = raw,
                None => debug!("Ignoring empty raw agent event"),
            },
        }
    }

    if text.trim().is_empty() || text == "None" {
        debug!("No reply text in agent events, using fallback");
        text = FALLBACK_REPLY.to_string();
    }

    AgentReply {
        text,
        tools_used,
        tokens_used,
    }
}

/// Pull `...` out of a printed `text='...'` field.
fn quoted_text(raw: &str) -> Option<&str> {
    let start = raw.find("text='")? + "text='".len();
    let len = raw[start..].find('\'')?;
    if len == 0 {
        return None;
    }
    Some(&raw[start..start + len])
}
