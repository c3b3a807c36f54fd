//! Wire types for the Ollama chat and tags endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
}

impl<'a> ChatRequestBody<'a> {
    /// A single-turn request carrying one user message.
    pub fn user(model: &'a str, content: &'a str, stream: bool) -> Self {
        Self {
            model,
            messages: vec![WireMessage {
                role: "user",
                content,
            }],
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// One object from a chat response: the whole reply when `stream=false`,
/// one line of the NDJSON body when `stream=true`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,

    #[serde(default)]
    pub done: bool,

    /// Set by the backend when generation fails after the response started.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// A chunk carrying `content` with the given completion flag.
    pub fn text(content: impl Into<String>, done: bool) -> Self {
        Self {
            message: Some(ChunkMessage {
                role: Some("assistant".to_string()),
                content: Some(content.into()),
            }),
            done,
            error: None,
        }
    }

    /// A chunk with no message at all.
    pub fn bare(done: bool) -> Self {
        Self {
            message: None,
            done,
            error: None,
        }
    }

    /// Text carried by this chunk, if it has a `message.content` field.
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref()?.content.as_deref()
    }
}

/// Body of `GET /api/tags`.
#[derive(Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
pub struct TagModel {
    pub name: String,
}

impl TagsResponse {
    pub fn into_names(self) -> Vec<String> {
        self.models.into_iter().map(|m| m.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_without_message() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"model":"mistral","done":false}"#).unwrap();
        assert_eq!(chunk.content(), None);
        assert!(!chunk.done);
    }

    #[test]
    fn test_final_chunk() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"mistral","message":{"role":"assistant","content":""},"done":true,"eval_count":12}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some(""));
        assert!(chunk.done);
    }

    #[test]
    fn test_tags_keep_order() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"mistral:latest","size":1},{"name":"llama3:8b","size":2}]}"#,
        )
        .unwrap();
        assert_eq!(tags.into_names(), vec!["mistral:latest", "llama3:8b"]);
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequestBody::user("mistral:latest", "hi", true);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["stream"], true);
    }
}
