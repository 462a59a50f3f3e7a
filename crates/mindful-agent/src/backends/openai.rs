use super::CompletionBackend;
use crate::config::{LlmProvider, ModelConfig};
use crate::stream::StreamEvent;
use async_trait::async_trait;
use futures_util::StreamExt;
use mindful_core::{MindfulError, MindfulResult, Role, Turn};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// OpenAI-compatible chat completions backend.
///
/// Works with Groq, OpenAI, OpenRouter and any other provider that implements
/// the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            // No timeout: a slow provider holds the exchange open.
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
    ) -> Vec<serde_json::Value> {
        let mut api_messages = Vec::with_capacity(history.len() + 2);

        api_messages.push(serde_json::json!({
            "role": "system",
            "content": preamble
        }));

        for turn in history {
            api_messages.push(serde_json::json!({
                "role": turn.role().as_str(),
                "content": turn.content()
            }));
        }

        api_messages.push(serde_json::json!({
            "role": Role::User.as_str(),
            "content": user_text
        }));

        api_messages
    }

    fn build_body(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
        stream: bool,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "temperature": self.config.temperature,
            "messages": self.build_messages(preamble, history, user_text),
        });

        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }

        body
    }

    fn add_provider_headers(
        &self,
        request: reqwest::RequestBuilder,
        api_key: &str,
    ) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json");

        // OpenRouter asks callers to identify themselves
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "Mindful")
        } else {
            request
        }
    }

    /// Sends one request and maps every failure to a transport error.
    async fn send(&self, body: &serde_json::Value) -> MindfulResult<reqwest::Response> {
        let api_key = self.config.credential()?;
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        debug!(model = %self.config.model_id, url = %url, "Sending completion request");

        let resp = self
            .add_provider_headers(self.http.post(&url), api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| MindfulError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await.unwrap_or_default();
            return Err(MindfulError::Transport(provider_error(status, &error_body)));
        }

        Ok(resp)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn ensure_credential(&self) -> MindfulResult<()> {
        self.config.credential().map(|_| ())
    }

    async fn complete(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
    ) -> MindfulResult<String> {
        let body = self.build_body(preamble, history, user_text, false);
        let resp = self.send(&body).await?;

        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MindfulError::Transport(e.to_string()))?;

        parse_completion_response(&resp_body)
    }

    async fn complete_stream(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
    ) -> MindfulResult<(mpsc::Receiver<StreamEvent>, JoinHandle<MindfulResult<String>>)> {
        let body = self.build_body(preamble, history, user_text, true);
        let resp = self.send(&body).await?;

        let (tx, rx) = mpsc::channel::<StreamEvent>(256);
        let mut stream = resp.bytes_stream();

        let handle = tokio::spawn(async move {
            // Bytes, not text: a UTF-8 sequence may straddle two chunks.
            let mut buffer: Vec<u8> = Vec::new();
            let mut reply = SseReply::default();

            let result = async {
                while let Some(chunk_result) = stream.next().await {
                    let chunk = chunk_result
                        .map_err(|e| MindfulError::Transport(format!("Stream read error: {e}")))?;
                    buffer.extend_from_slice(&chunk);

                    while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=line_end).collect();
                        reply.handle_line(&line, &tx).await?;
                    }
                }
                if !buffer.is_empty() {
                    reply.handle_line(&buffer, &tx).await?;
                }
                reply.finish()
            }
            .await;

            if let Err(e) = &result {
                let _ = tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
            result
        });

        Ok((rx, handle))
    }
}

/// Accumulated state of one SSE completion stream.
#[derive(Debug, Default)]
struct SseReply {
    text: String,
    done: bool,
}

impl SseReply {
    /// Handles one raw line, newline included.
    async fn handle_line(
        &mut self,
        raw: &[u8],
        tx: &mpsc::Sender<StreamEvent>,
    ) -> MindfulResult<()> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| MindfulError::Transport(format!("Stream was not valid UTF-8: {e}")))?
            .trim();

        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            return Ok(());
        };

        if data == "[DONE]" {
            self.mark_done(tx).await;
            return Ok(());
        }

        let event: serde_json::Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(_) => return Ok(()),
        };

        if let Some(message) = event["error"]["message"].as_str() {
            return Err(MindfulError::Transport(message.to_string()));
        }

        let choice = &event["choices"][0];

        if let Some(content) = choice["delta"]["content"].as_str() {
            if !content.is_empty() {
                self.text.push_str(content);
                let _ = tx
                    .send(StreamEvent::TextDelta {
                        text: content.to_string(),
                    })
                    .await;
            }
        }

        if choice["finish_reason"].is_string() {
            self.mark_done(tx).await;
        }
        Ok(())
    }

    async fn mark_done(&mut self, tx: &mpsc::Sender<StreamEvent>) {
        if !self.done {
            self.done = true;
            let _ = tx.send(StreamEvent::Done).await;
        }
    }

    /// The full reply, provided the provider finished it.
    fn finish(self) -> MindfulResult<String> {
        if !self.done {
            return Err(MindfulError::Transport(
                "Stream ended before completion".to_string(),
            ));
        }
        if self.text.trim().is_empty() {
            return Err(MindfulError::Transport(
                "Provider returned an empty reply".to_string(),
            ));
        }
        Ok(self.text)
    }
}

/// Extracts the reply text from a non-streaming chat completion body.
pub fn parse_completion_response(body: &serde_json::Value) -> MindfulResult<String> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            MindfulError::Transport("Provider response contained no message content".to_string())
        })?;
    if content.trim().is_empty() {
        return Err(MindfulError::Transport(
            "Provider returned an empty reply".to_string(),
        ));
    }
    Ok(content.to_string())
}

/// Builds the transport error message for a non-2xx provider response,
/// preferring the provider's own `error.message`.
fn provider_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("Provider returned {status}: {detail}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new(ModelConfig {
            api_key: Some("test-key".to_string()),
            ..ModelConfig::default()
        })
    }

    #[test]
    fn test_messages_put_preamble_first_and_user_text_last() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        let messages = backend().build_messages("Be kind.", &history, "I feel tired");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be kind.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "I feel tired");
    }

    #[test]
    fn test_body_carries_model_and_temperature() {
        let body = backend().build_body("p", &[], "hello", false);
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stream").is_none());

        let body = backend().build_body("p", &[], "hello", true);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_parse_completion_response() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Breathe in."}, "finish_reason": "stop"}]
        });
        assert_eq!(parse_completion_response(&body).unwrap(), "Breathe in.");
    }

    #[test]
    fn test_parse_completion_response_without_content() {
        let body = serde_json::json!({"choices": []});
        let err = parse_completion_response(&body).unwrap_err();
        assert!(matches!(err, MindfulError::Transport(_)));
    }

    #[test]
    fn test_parse_completion_response_rejects_blank_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  "}, "finish_reason": "stop"}]
        });
        let err = parse_completion_response(&body).unwrap_err();
        assert!(err.to_string().contains("empty reply"));
    }

    #[tokio::test]
    async fn test_sse_reply_requires_terminator() {
        let (tx, _rx) = mpsc::channel(8);
        let mut reply = SseReply::default();
        reply
            .handle_line(br#"data: {"choices":[{"delta":{"content":"Partial"}}]}"#, &tx)
            .await
            .unwrap();
        let err = reply.finish().unwrap_err();
        assert!(err.to_string().contains("ended before completion"));
    }

    #[tokio::test]
    async fn test_sse_reply_rejects_invalid_utf8_line() {
        let (tx, _rx) = mpsc::channel(8);
        let mut reply = SseReply::default();
        let err = reply.handle_line(b"data: \xF0\x9F\n", &tx).await.unwrap_err();
        assert!(matches!(err, MindfulError::Transport(_)));
    }

    #[test]
    fn test_provider_error_prefers_error_message() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        let message = provider_error(StatusCode::UNAUTHORIZED, body);
        assert_eq!(message, "Provider returned 401 Unauthorized: Invalid API Key");
    }

    #[test]
    fn test_provider_error_falls_back_to_body() {
        let message = provider_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(message, "Provider returned 502 Bad Gateway: upstream down");
    }
}
