//! Integration tests for the large-context processor

use async_trait::async_trait;
use recap::backend::{BackendError, Completion, CompletionParams, ModelBackend};
use recap::context::{ContextRoute, TRUNCATION_MARKER};
use recap::estimate::estimate_messages;
use recap::{fit_to_budget, split_into_chunks, Language, LargeContextConfig, LargeContextProcessor};
use recap_store::ChatMessage;
use std::sync::{Arc, Mutex};

/// Records every request and answers with its position in the call sequence
#[derive(Default)]
struct RecordingBackend {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingBackend {
    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _params: &CompletionParams,
    ) -> Result<Completion, BackendError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(messages.to_vec());
        Ok(Completion {
            text: format!("reply #{}", requests.len()),
            model: "recording".to_string(),
        })
    }
}

/// 600,000 chars in twelve 50,000-char messages
fn huge_history() -> Vec<ChatMessage> {
    (0..12)
        .map(|i| {
            let body = format!("{:02}", i).repeat(25_000);
            if i % 2 == 0 {
                ChatMessage::user(body)
            } else {
                ChatMessage::assistant(body)
            }
        })
        .collect()
}

#[test]
fn test_huge_history_routes_to_chunked_path() {
    let processor = LargeContextProcessor::new(
        Arc::new(RecordingBackend::default()),
        LargeContextConfig::default(),
    );

    assert_eq!(processor.route(&huge_history()), ContextRoute::Chunked);
    assert_eq!(
        processor.route(&[ChatMessage::user("a short question")]),
        ContextRoute::Direct
    );
}

#[tokio::test]
async fn test_huge_history_processed_chunk_by_chunk() {
    let backend = Arc::new(RecordingBackend::default());
    let processor = LargeContextProcessor::new(backend.clone(), LargeContextConfig::default());
    let history = huge_history();

    let completion = processor
        .process(&history, &CompletionParams::default(), Language::En)
        .await
        .unwrap();

    // 12 chunk calls and 11 rolling summaries
    let requests = backend.requests();
    assert_eq!(requests.len(), 23);
    assert_eq!(completion.text, "reply #23");

    // Every chunk after the first starts with the previous rolling summary
    for (chunk_index, request) in requests.iter().skip(2).step_by(2).enumerate() {
        let summary_reply = format!("reply #{}", chunk_index * 2 + 2);
        assert_eq!(
            request[0],
            ChatMessage::system(Language::En.summary_wrapper(&summary_reply))
        );
        assert_eq!(request[1], history[chunk_index + 1]);
    }

    // Every request fits the context window
    let window = LargeContextConfig::default().context_window_tokens;
    for request in &requests {
        assert!(estimate_messages(request) <= window - window / 3 + 1);
    }
}

#[tokio::test]
async fn test_rolling_summary_covers_latest_chunk() {
    let backend = Arc::new(RecordingBackend::default());
    let processor = LargeContextProcessor::new(backend.clone(), LargeContextConfig::default());
    let history = huge_history();

    processor
        .process(&history, &CompletionParams::default(), Language::En)
        .await
        .unwrap();

    // The summary sent before the last chunk rolls the previous summary
    // forward over the penultimate chunk
    let requests = backend.requests();
    let final_summary = &requests[21];
    assert_eq!(
        final_summary[0],
        ChatMessage::system(Language::En.summary_wrapper("reply #20"))
    );
    let body = &final_summary[1].content;
    assert!(body.contains(&history[10].content));
    assert!(!body.contains(&history[9].content));
    assert!(!body.contains(&history[11].content));
}

#[test]
fn test_fit_to_budget_example() {
    let u2 = "x".repeat(200);
    let messages = vec![
        ChatMessage::system("S"),
        ChatMessage::user("first question"),
        ChatMessage::user(u2.clone()),
    ];

    let fitted = fit_to_budget(&messages, 40);

    assert_eq!(fitted.len(), 2);
    assert_eq!(fitted[0], messages[0]);
    assert!(fitted[1].content.ends_with(TRUNCATION_MARKER));
    assert!(u2.starts_with(fitted[1].content.trim_end_matches(TRUNCATION_MARKER)));
    assert_eq!(fit_to_budget(&fitted, 40), fitted);
}

#[test]
fn test_chunks_cover_history_in_order() {
    let mut history = huge_history();
    history.insert(3, ChatMessage::user("tiny"));
    history.push(ChatMessage::assistant("y".repeat(120_000)));

    let chunks = split_into_chunks(&history, 50_000);

    let rejoined: Vec<ChatMessage> = chunks.iter().flat_map(|c| c.messages.clone()).collect();
    assert_eq!(rejoined, history);
    for chunk in &chunks {
        assert!(chunk.size_chars <= 50_000 || chunk.messages.len() == 1);
    }
}
