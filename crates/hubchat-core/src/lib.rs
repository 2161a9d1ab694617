pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod ingest;
pub mod observer;
pub mod session;
pub mod sse;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use backend::{ByteStream, ChatBackend};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{Frame, StreamEvent};
pub use http::HttpBackend;
pub use ingest::{IngestOutcome, IngestSink, StreamState, FAILURE_NOTICE};
pub use observer::{AlwaysConfirm, Confirm, NullObserver, SessionObserver};
pub use session::{ChatSession, DeleteOutcome, SendOutcome, SessionState, SkipReason};
pub use sse::FrameDecoder;
pub use state::{Conversation, ConversationId, Message, Role};
pub use transcript::{MessageRef, Transcript};
