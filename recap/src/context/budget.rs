//! Fitting a conversation into a token budget

use recap_store::ChatMessage;

use crate::estimate::{estimate_tokens, CHARS_PER_TOKEN};

/// Appended to a message cut short by [`fit_to_budget`]
pub const TRUNCATION_MARKER: &str = "...";

/// Trim `messages` so they fit in `max_tokens` with a third held back for the reply.
///
/// A leading system message is always kept and paid for first. The rest are
/// taken newest first while they fit; the first one that doesn't is cut to
/// the remaining allowance plus [`TRUNCATION_MARKER`] and everything older is
/// dropped. When the allowance is already exhausted the overflowing message is
/// dropped too. Output keeps chronological order.
///
/// Applying it to its own output returns the same messages.
pub fn fit_to_budget(messages: &[ChatMessage], max_tokens: usize) -> Vec<ChatMessage> {
    let (system, history) = match messages.split_first() {
        Some((first, rest)) if first.is_system() => (Some(first), rest),
        _ => (None, messages),
    };

    let reserved_for_reply = max_tokens / 3;
    let mut available = max_tokens - reserved_for_reply;
    if let Some(system) = system {
        available = available.saturating_sub(estimate_tokens(&system.content));
    }

    let mut used = 0;
    let mut kept = Vec::new();
    for message in history.iter().rev() {
        let cost = estimate_tokens(&message.content);
        if used + cost <= available {
            used += cost;
            kept.push(message.clone());
            continue;
        }

        let remaining = available - used;
        if remaining > 0 {
            let allowance = remaining * CHARS_PER_TOKEN;
            kept.push(ChatMessage::new(message.role, truncate_chars(&message.content, allowance)));
        }
        break;
    }

    let mut fitted = Vec::with_capacity(kept.len() + 1);
    fitted.extend(system.cloned());
    fitted.extend(kept.into_iter().rev());
    fitted
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}
