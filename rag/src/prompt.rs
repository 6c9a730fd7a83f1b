//! Prompt composition and response cleanup.

use confidant_core::ConversationTurn;

/// Instruction block opening every prompt.
pub const SYSTEM_PROMPT: &str = "You are Confidant, a helpful AI assistant for health questions. \
Be concise, friendly, and accurate. Keep responses brief (2-3 sentences when possible). \
Remember: you're not a substitute for professional medical advice. \
Respond directly to the user's question without generating example conversations or meta-dialogue.";

const ERROR_PREFIX: &str = "Failed to process query:";

/// Builds the generation prompt.
///
/// Layout: system block, blank line, the assembled context (if any), the last `history_turns`
/// turns as `User:`/`Assistant:` lines, then the query and an open `Assistant:` label.
#[must_use]
pub fn compose_prompt(
    context: &str,
    history: &[ConversationTurn],
    history_turns: usize,
    query: &str,
) -> String {
    let mut prompt = format!("{SYSTEM_PROMPT}\n\n");
    if !context.is_empty() {
        prompt.push_str(context);
        prompt.push('\n');
    }
    let recent = &history[history.len().saturating_sub(history_turns)..];
    for turn in recent {
        prompt.push_str(turn.role.label());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("User: ");
    prompt.push_str(query);
    prompt.push_str("\nAssistant:");
    prompt
}

/// Removes conversation labels the model echoed into its answer.
///
/// Drops lines starting with `User:` or `Assistant:`, cuts everything from an inline `User:`
/// onwards and removes inline `Assistant:` labels. Matching ignores ASCII case.
#[must_use]
pub fn clean_response(raw: &str) -> String {
    let kept: Vec<&str> = raw
        .trim()
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !starts_with_ignore_case(line, "user:") && !starts_with_ignore_case(line, "assistant:")
        })
        .collect();
    let mut text = kept.join("\n").trim().to_string();

    if let Some(position) = find_ignore_case(&text, "user:") {
        text.truncate(position);
    }
    while let Some(position) = find_ignore_case(&text, "assistant:") {
        let rest = text[position + "assistant:".len()..].trim_start().to_string();
        let head = text[..position].trim_end().to_string();
        text = match (head.is_empty(), rest.is_empty()) {
            (true, _) => rest,
            (false, true) => head,
            (false, false) => format!("{head} {rest}"),
        };
    }
    text.trim().to_string()
}

/// Strips the duplicated "Failed to process query:" prefix runtimes put on error messages.
#[must_use]
pub fn normalize_error_message(message: &str) -> String {
    let cleaned = message.replace(ERROR_PREFIX, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "Failed to generate response".to_string()
    } else {
        cleaned.to_string()
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn find_ignore_case(text: &str, needle: &str) -> Option<usize> {
    text.to_ascii_lowercase().find(needle)
}
