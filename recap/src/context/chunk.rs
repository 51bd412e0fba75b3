//! Splitting a history into size-bounded chunks

use recap_store::ChatMessage;

use crate::estimate::char_len;

/// Consecutive messages sent to the backend together
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub messages: Vec<ChatMessage>,
    /// Total content length in chars
    pub size_chars: usize,
}

impl Chunk {
    /// `role: content` lines, one per message
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(ChatMessage::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split into ordered chunks of at most `max_chars` content chars.
///
/// Messages are never split; one longer than `max_chars` becomes a chunk of
/// its own. Concatenating the chunks gives back the input.
pub fn split_into_chunks(messages: &[ChatMessage], max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk {
        messages: Vec::new(),
        size_chars: 0,
    };

    for message in messages {
        let len = char_len(&message.content);
        if !current.messages.is_empty() && current.size_chars + len > max_chars {
            chunks.push(std::mem::replace(
                &mut current,
                Chunk {
                    messages: Vec::new(),
                    size_chars: 0,
                },
            ));
        }
        current.size_chars += len;
        current.messages.push(message.clone());
    }

    if !current.messages.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(n: usize) -> ChatMessage {
        ChatMessage::user("m".repeat(n))
    }

    #[test]
    fn test_packs_greedily() {
        let messages = vec![sized(40), sized(50), sized(10), sized(30)];

        let chunks = split_into_chunks(&messages, 100);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.size_chars).collect();
        assert_eq!(sizes, vec![100, 30]);
    }

    #[test]
    fn test_oversized_message_gets_own_chunk() {
        let messages = vec![sized(10), sized(500), sized(10)];

        let chunks = split_into_chunks(&messages, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].messages, vec![sized(500)]);
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let messages: Vec<ChatMessage> = (0..37).map(|i| sized((i * 13) % 71 + 1)).collect();

        for max in [1, 50, 100, 1000] {
            let chunks = split_into_chunks(&messages, max);
            let rejoined: Vec<ChatMessage> = chunks.into_iter().flat_map(|c| c.messages).collect();
            assert_eq!(rejoined, messages);
        }
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        assert!(split_into_chunks(&[], 100).is_empty());
    }

    #[test]
    fn test_transcript_lines() {
        let chunk = Chunk {
            messages: vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            size_chars: 7,
        };
        assert_eq!(chunk.transcript(), "user: hi\nassistant: hello");
    }
}
