//! Streaming ingestion: decoded lines in, transcript and title updates out.

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::backend::ByteStream;
use crate::event::{Frame, StreamEvent};
use crate::sse::FrameDecoder;
use crate::state::ConversationId;
use crate::transcript::MessageRef;

/// Shown in place of the reply when the send request or its stream fails.
pub const FAILURE_NOTICE: &str = "Failed to connect. Is Ollama running?";

/// Where ingestion writes its effects.
pub trait IngestSink {
    /// Replace the placeholder message's content.
    fn update_placeholder(&mut self, placeholder: MessageRef, content: &str);

    fn set_title(&mut self, conversation: ConversationId, title: &str);

    fn scroll_to_bottom(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The byte stream was exhausted.
    Completed { text: String },
    /// The byte stream broke; the placeholder now shows [`FAILURE_NOTICE`].
    Failed,
}

/// Per-send accumulator for the assistant reply.
#[derive(Debug)]
pub struct StreamState {
    conversation: ConversationId,
    placeholder: MessageRef,
    text: String,
}

impl StreamState {
    pub fn new(conversation: ConversationId, placeholder: MessageRef) -> Self {
        Self {
            conversation,
            placeholder,
            text: String::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Classify one decoded line and apply it. Malformed payloads are skipped.
    pub fn apply_line<S: IngestSink + ?Sized>(&mut self, line: &str, sink: &mut S) {
        match Frame::parse(line) {
            Frame::Ignored | Frame::Done => {}
            Frame::Malformed(payload) => {
                debug!(payload_len = payload.len(), "skipping malformed stream payload");
            }
            Frame::Event(event) => self.apply(&event, sink),
        }
    }

    pub fn apply<S: IngestSink + ?Sized>(&mut self, event: &StreamEvent, sink: &mut S) {
        if let Some(token) = non_empty(&event.token) {
            self.text.push_str(token);
            sink.update_placeholder(self.placeholder, &self.text);
            sink.scroll_to_bottom();
        }
        if let Some(title) = non_empty(&event.title) {
            sink.set_title(self.conversation, title);
        }
        if let Some(error) = non_empty(&event.error) {
            self.text.push_str("\n\n[Error: ");
            self.text.push_str(error);
            self.text.push(']');
            sink.update_placeholder(self.placeholder, &self.text);
        }
    }

    /// Transport failure: the placeholder is overwritten with the fixed notice.
    pub fn fail<S: IngestSink + ?Sized>(self, sink: &mut S) {
        sink.update_placeholder(self.placeholder, FAILURE_NOTICE);
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Drain `body` into `state` until the stream is exhausted or breaks.
pub async fn ingest<S: IngestSink + Send + ?Sized>(
    mut body: ByteStream,
    mut state: StreamState,
    sink: &mut S,
) -> IngestOutcome {
    let mut decoder = FrameDecoder::new();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for line in decoder.push(&bytes) {
                    state.apply_line(&line, sink);
                }
            }
            Err(err) => {
                warn!(conversation = %state.conversation, error = %err, "reply stream failed");
                decoder.finish();
                state.fail(sink);
                return IngestOutcome::Failed;
            }
        }
    }

    decoder.finish();
    IngestOutcome::Completed { text: state.text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::state::Message;
    use crate::transcript::Transcript;
    use bytes::Bytes;
    use futures_util::stream;

    #[derive(Default)]
    struct RecordingSink {
        transcript: Transcript,
        titles: Vec<(ConversationId, String)>,
        scrolls: usize,
    }

    impl IngestSink for RecordingSink {
        fn update_placeholder(&mut self, placeholder: MessageRef, content: &str) {
            self.transcript.set_content(placeholder, content);
        }

        fn set_title(&mut self, conversation: ConversationId, title: &str) {
            self.titles.push((conversation, title.to_string()));
        }

        fn scroll_to_bottom(&mut self) {
            self.scrolls += 1;
        }
    }

    fn setup() -> (RecordingSink, StreamState) {
        let mut sink = RecordingSink::default();
        sink.transcript.push(Message::user("hi there"));
        let placeholder = sink.transcript.push(Message::assistant(""));
        (sink, StreamState::new(ConversationId(1), placeholder))
    }

    fn body(chunks: &[&'static str]) -> ByteStream {
        let items: Vec<crate::error::Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        stream::iter(items).boxed()
    }

    fn reply(sink: &RecordingSink) -> &str {
        &sink.transcript.messages()[1].content
    }

    #[test]
    fn test_tokens_accumulate() {
        let (mut sink, mut state) = setup();
        state.apply_line(r#"data: {"token":"Hel"}"#, &mut sink);
        state.apply_line(r#"data: {"token":"lo"}"#, &mut sink);
        assert_eq!(state.text(), "Hello");
        assert_eq!(reply(&sink), "Hello");
        assert_eq!(sink.scrolls, 2);
    }

    #[test]
    fn test_error_appended_inline() {
        let (mut sink, mut state) = setup();
        state.apply_line(r#"data: {"token":"Hi"}"#, &mut sink);
        state.apply_line(r#"data: {"error":"boom"}"#, &mut sink);
        assert_eq!(reply(&sink), "Hi\n\n[Error: boom]");

        // the stream keeps going after an error event
        state.apply_line(r#"data: {"token":"!"}"#, &mut sink);
        assert_eq!(reply(&sink), "Hi\n\n[Error: boom]!");
    }

    #[test]
    fn test_title_does_not_touch_transcript() {
        let (mut sink, mut state) = setup();
        state.apply_line(r#"data: {"title":"Essay help"}"#, &mut sink);
        assert_eq!(sink.titles, vec![(ConversationId(1), "Essay help".to_string())]);
        assert_eq!(reply(&sink), "");
    }

    #[test]
    fn test_all_fields_in_one_payload() {
        let (mut sink, mut state) = setup();
        state.apply_line(r#"data: {"token":"a","title":"T","error":"e"}"#, &mut sink);
        assert_eq!(reply(&sink), "a\n\n[Error: e]");
        assert_eq!(sink.titles.len(), 1);
    }

    #[test]
    fn test_noop_payloads() {
        let (mut sink, mut state) = setup();
        state.apply_line(r#"data: {"token":"Hi"}"#, &mut sink);
        for line in [
            "data: [DONE]",
            "data: {}",
            r#"data: {"other":1}"#,
            r#"data: {"token":""}"#,
            r#"data: {"tok"#,
            "",
            ": keepalive",
        ] {
            state.apply_line(line, &mut sink);
        }
        assert_eq!(state.text(), "Hi");
        assert_eq!(reply(&sink), "Hi");
        assert!(sink.titles.is_empty());
        assert_eq!(sink.scrolls, 1);
    }

    #[tokio::test]
    async fn test_ingest_reassembles_split_payload() {
        let (mut sink, state) = setup();
        let outcome = ingest(
            body(&["data: {\"token\":\"Hel\"}\n\nda", "ta: {\"tok", "en\":\"lo\"}\n\ndata: [DONE]\n\n"]),
            state,
            &mut sink,
        )
        .await;
        assert_eq!(outcome, IngestOutcome::Completed { text: "Hello".to_string() });
        assert_eq!(reply(&sink), "Hello");
    }

    #[tokio::test]
    async fn test_ingest_transport_failure_shows_notice() {
        let (mut sink, state) = setup();
        let items: Vec<crate::error::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"token\":\"par\"}\n")),
            Err(Error::Status { status: 502, body: String::new() }),
        ];
        let outcome = ingest(stream::iter(items).boxed(), state, &mut sink).await;
        assert_eq!(outcome, IngestOutcome::Failed);
        assert_eq!(reply(&sink), FAILURE_NOTICE);
    }
}
