//! Coarse token estimation
//!
//! One token is taken to be four characters. This is not a tokenizer; every
//! budget decision built on it inherits the error.

use recap_store::ChatMessage;

/// Characters assumed per token
pub const CHARS_PER_TOKEN: usize = 4;

/// Number of characters in `text`, the unit all budgets are measured in
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// `ceil(chars / 4)`
pub fn estimate_tokens(text: &str) -> usize {
    char_len(text).div_ceil(CHARS_PER_TOKEN)
}

/// Sum of the estimates of every message body
pub fn estimate_messages(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // 4 chars, 12 bytes
        assert_eq!(estimate_tokens("你好世界"), 1);
    }

    #[test]
    fn test_estimate_messages() {
        let messages = vec![
            ChatMessage::system("abcd"),
            ChatMessage::user("abcdefgh"),
            ChatMessage::assistant("a"),
        ];
        assert_eq!(estimate_messages(&messages), 4);
    }
}
