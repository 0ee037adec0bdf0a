use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::ChatBackend;
use crate::config::{require_secret, LlmConfig, API_KEY_VAR};
use crate::error::{GatewayError, GatewayResult};
use crate::model::chat::ChatTurn;

/// Chat-completions client for the Spark OpenAI deployment.
pub struct SparkClient {
    url: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl SparkClient {
    pub fn new(config: &LlmConfig, api_key: &str) -> Self {
        Self {
            url: format!(
                "{}/v1/{}/openai/deployments/{}/chat/completions?api_version={}",
                config.env_url.trim_end_matches('/'),
                config.app_id,
                config.model,
                config.api_version
            ),
            api_key: api_key.to_string(),
            temperature: config.temperature,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env(config: &LlmConfig) -> GatewayResult<Self> {
        let key = require_secret(API_KEY_VAR, |name| std::env::var(name).ok())?;
        Ok(Self::new(config, &key))
    }
}

#[async_trait]
impl ChatBackend for SparkClient {
    async fn complete(&self, turns: &[ChatTurn]) -> GatewayResult<String> {
        let payload = json!({
            "messages": turns,
            "temperature": self.temperature,
            "n": 1,
            "stream": false,
            "presence_penalty": 0,
            "frequency_penalty": 0,
            "top_p": 1,
        });
        debug!(url = %self.url, turns = turns.len(), "POST chat completion");

        let resp = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::ModelGateway {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = resp.json().await?;
        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GatewayError::ModelGateway {
                status: status.as_u16(),
                body: format!("reply has no message content: {data}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(url: &str) -> LlmConfig {
        LlmConfig {
            env_url: url.to_string(),
            ..LlmConfig::default()
        }
    }

    const PATH: &str = "/v1/sparkassist/openai/deployments/gpt-4o-2024-11-20/chat/completions";

    #[tokio::test]
    async fn sends_messages_and_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded(
                "api_version".into(),
                "2024-10-21".into(),
            ))
            .match_header("api-key", "secret")
            .match_body(Matcher::PartialJson(json!({
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hi" }
                ],
                "n": 1,
                "stream": false
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"ok\":true}"}}]}"#)
            .create_async()
            .await;

        let client = SparkClient::new(&config(&server.url()), "secret");
        let reply = client
            .complete(&[ChatTurn::system("be brief"), ChatTurn::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply, "{\"ok\":true}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_failure_is_model_gateway_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = SparkClient::new(&config(&server.url()), "secret");
        match client.complete(&[ChatTurn::user("hi")]).await.unwrap_err() {
            GatewayError::ModelGateway { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_without_choices_is_model_gateway_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = SparkClient::new(&config(&server.url()), "secret");
        let err = client.complete(&[ChatTurn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, GatewayError::ModelGateway { status: 200, .. }));
    }
}
