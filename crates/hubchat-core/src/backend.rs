use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::state::{ConversationId, Message};

/// Raw body of a streaming send response, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// The chat backend's HTTP surface.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat/new`
    async fn create_conversation(&self) -> Result<ConversationId>;

    /// `GET /chat/{id}/messages`
    async fn list_messages(&self, id: ConversationId) -> Result<Vec<Message>>;

    /// `POST /chat/{id}/send`. Resolves once the response has started; the
    /// body is delivered through the returned stream.
    async fn send_message(&self, id: ConversationId, message: &str) -> Result<ByteStream>;

    /// `POST /chat/{id}/delete`
    async fn delete_conversation(&self, id: ConversationId) -> Result<()>;

    /// `GET /api/llm-status`
    async fn llm_status(&self) -> Result<bool>;
}
