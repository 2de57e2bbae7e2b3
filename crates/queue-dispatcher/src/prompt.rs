//! Turns an inbound request into the prompt sent to the agent.

use agent_core::InboundRequest;

/// How many of the most recent history entries are included.
pub const HISTORY_WINDOW: usize = 5;

/// Build the agent prompt for `request`.
///
/// ```text
/// User Context: {userNotes}            (only when notes are present)
///
/// Recent Conversation:                 (only when history is present)
/// - {content}
///
/// Current Message from {name}: {text}
/// ```
pub fn build_prompt(request: &InboundRequest) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(notes) = request
        .context
        .user_notes
        .as_deref()
        .filter(|notes| !notes.is_empty())
    {
        lines.push(format!("User Context: {}", notes));
    }

    let history = &request.context.conversation_history;
    if !history.is_empty() {
        lines.push("\nRecent Conversation:".to_string());
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        for entry in &history[start..] {
            lines.push(format!("- {}", entry.content));
        }
    }

    lines.push(format!(
        "\nCurrent Message from {}: {}",
        request.contact.display_name(),
        request.message.text
    ));

    lines.join("\n")
}
