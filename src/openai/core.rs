use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// Anything that can turn an ordered list of role-tagged messages into
/// a single text completion.
#[async_trait]
pub trait LanguageModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error>;
}

pub type BoxedLanguageModel = Box<dyn LanguageModel + Send + Sync + 'static>;

pub async fn completion(
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    headers: &[(&str, &str)],
) -> Result<Value, Error> {
    let payload = json!({
        "model": model,
        "messages": messages,
    });
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let mut request = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 2));
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.json(&payload).send().await?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let reason = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body["error"]["message"].as_str().map(String::from))
            .unwrap_or(text);
        bail!("Completion failed: {} ({})", status, reason);
    }

    Ok(serde_json::from_str(&text)?)
}

/// Reasoning models served through OpenRouter (e.g. qwen3) can leak
/// their chain of thought as a `<think>` block before the answer.
fn strip_reasoning(content: &str) -> String {
    static THINK_RE: OnceLock<Regex> = OnceLock::new();
    THINK_RE
        .get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex must compile"))
        .replace_all(content, "")
        .trim()
        .to_string()
}

/// Chat completions client for OpenRouter or any other OpenAI
/// compatible API.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_hostname: String,
    api_key: String,
    model: String,
    referer: String,
    title: String,
}

impl OpenAiClient {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            referer: String::from("http://localhost:2222"),
            title: String::from("Calendar Agent"),
        }
    }

    /// Attribution headers OpenRouter uses to identify the app.
    pub fn with_app(mut self, referer: &str, title: &str) -> Self {
        self.referer = referer.to_string();
        self.title = title.to_string();
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error> {
        let resp = completion(
            messages,
            &self.api_hostname,
            &self.api_key,
            &self.model,
            &[
                ("HTTP-Referer", self.referer.as_str()),
                ("X-Title", self.title.as_str()),
            ],
        )
        .await?;

        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(anyhow!("No message received. Resp:\n\n {}", resp))?;

        Ok(strip_reasoning(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );
    }

    #[test]
    fn test_strip_reasoning() {
        let content = "<think>\nThe user wants a meeting.\n</think>\n\nSure, I can book that.";
        assert_eq!(strip_reasoning(content), "Sure, I can book that.");
        assert_eq!(strip_reasoning("No thinking here"), "No thinking here");
    }

    #[tokio::test]
    async fn test_completion_basic() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "qwen/qwen3-32b",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello!"
                },
                "finish_reason": "stop"
            }]
        }"#;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create();

        let messages = vec![Message::new(Role::User, "Hi")];
        let result = completion(
            &messages,
            server.url().as_str(),
            "test-key",
            "qwen/qwen3-32b",
            &[],
        )
        .await;

        mock.assert();
        let json = result.unwrap();
        assert_eq!(json["choices"][0]["message"]["content"], "Hello!");
    }

    #[tokio::test]
    async fn test_client_complete_sends_app_headers() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("http-referer", "https://cal.example.com")
            .match_header("x-title", "Test Agent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"<think>hmm</think>I'll book a meeting"}}]}"#,
            )
            .create();

        let client = OpenAiClient::new(&server.url(), "test-key", "qwen/qwen3-32b")
            .with_app("https://cal.example.com", "Test Agent");
        let reply = client
            .complete(&[Message::new(Role::User, "Book a meeting")])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(reply, "I'll book a meeting");
    }

    #[tokio::test]
    async fn test_client_complete_error_status() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "No auth credentials found", "code": 401}}"#)
            .create();

        let client = OpenAiClient::new(&server.url(), "bad-key", "qwen/qwen3-32b");
        let err = client
            .complete(&[Message::new(Role::User, "Hi")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("No auth credentials found"));
    }

    #[tokio::test]
    async fn test_client_complete_missing_content() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create();

        let client = OpenAiClient::new(&server.url(), "test-key", "qwen/qwen3-32b");
        let result = client.complete(&[Message::new(Role::User, "Hi")]).await;

        assert!(result.is_err());
    }
}
