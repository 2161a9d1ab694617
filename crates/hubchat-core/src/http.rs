use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{ByteStream, ChatBackend};
use crate::error::{Error, Result};
use crate::state::{ConversationId, Message};

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct NewConversationResponse {
    id: ConversationId,
}

#[derive(Deserialize)]
struct LlmStatusResponse {
    available: bool,
}

/// [`ChatBackend`] over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn create_conversation(&self) -> Result<ConversationId> {
        let response = self.client.post(self.url("/chat/new")).send().await?;
        let created: NewConversationResponse = check_status(response).await?.json().await?;
        Ok(created.id)
    }

    async fn list_messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        let url = self.url(&format!("/chat/{}/messages", id));
        let response = self.client.get(url).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn send_message(&self, id: ConversationId, message: &str) -> Result<ByteStream> {
        let url = self.url(&format!("/chat/{}/send", id));
        let response = self
            .client
            .post(url)
            .json(&SendRequest { message })
            .send()
            .await?;
        let response = check_status(response).await?;
        debug!(conversation = %id, "send stream opened");
        Ok(response.bytes_stream().map(|chunk| chunk.map_err(Error::from)).boxed())
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<()> {
        let url = self.url(&format!("/chat/{}/delete", id));
        let response = self.client.post(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn llm_status(&self) -> Result<bool> {
        let response = self.client.get(self.url("/api/llm-status")).send().await?;
        let status: LlmStatusResponse = check_status(response).await?.json().await?;
        Ok(status.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_joins_without_double_slash() {
        let backend = HttpBackend::new("http://localhost:5000/");
        assert_eq!(backend.url("/chat/new"), "http://localhost:5000/chat/new");
        assert_eq!(backend.url("api/llm-status"), "http://localhost:5000/api/llm-status");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chat/7/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "role": "system", "content": "ctx" },
                { "role": "user", "content": "hello" }
            ])))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri());
        let id = backend.create_conversation().await.unwrap();
        assert_eq!(id, ConversationId(7));

        let messages = backend.list_messages(id).await.unwrap();
        assert_eq!(messages, vec![Message::system("ctx"), Message::user("hello")]);
    }

    #[tokio::test]
    async fn test_send_streams_body() {
        let server = MockServer::start().await;
        let body = "data: {\"token\":\"Hi\"}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/3/send"))
            .and(body_json(json!({ "message": "hey" })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri());
        let mut stream = backend.send_message(ConversationId(3), "hey").await.unwrap();
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, body.as_bytes());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/3/send"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Empty message" })))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri());
        match backend.send_message(ConversationId(3), "").await {
            Err(Error::Status { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Empty message"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_delete_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/9/delete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/llm-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": false })))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri());
        backend.delete_conversation(ConversationId(9)).await.unwrap();
        assert!(!backend.llm_status().await.unwrap());
    }
}
