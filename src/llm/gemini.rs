use super::{AnswerService, LlmError, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`, if present and non-empty.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.is_empty())
    }
}

/// Client for the `generateContent` family of endpoints.
///
/// The API key travels in the query string and is left out of every error.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn build_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: format!("models/{}", self.config.model),
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }

    async fn post(
        &self,
        method: &str,
        query: &[(&str, &str)],
        prompt: &str,
    ) -> Result<reqwest::Response, LlmError> {
        tracing::debug!(model = %self.config.model, prompt_chars = prompt.len(), "sending request");

        let resp = self
            .client
            .post(self.endpoint(method))
            .query(query)
            .query(&[("key", self.config.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl AnswerService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let resp = self.post("generateContent", &[], prompt).await?;

        let body = resp.text().await?;
        let data: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(data.first_text())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
    ) -> Result<Option<String>, LlmError> {
        let resp = self
            .post("streamGenerateContent", &[("alt", "sse")], prompt)
            .await?;

        let mut full_content = String::new();
        let mut stream = resp.bytes_stream();
        // Raw bytes: a network chunk may end inside a multi-byte character.
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                forward_event(line.trim(), &mut full_content, on_chunk);
            }
        }
        // Last event may arrive without a trailing newline.
        let rest = String::from_utf8_lossy(&buffer);
        forward_event(rest.trim(), &mut full_content, on_chunk);

        on_chunk(StreamChunk {
            delta: String::new(),
            done: true,
        });
        Ok(Some(full_content).filter(|text| !text.is_empty()))
    }
}

fn forward_event(
    line: &str,
    full_content: &mut String,
    on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
) {
    let Some(data) = line.strip_prefix("data:") else {
        return;
    };
    match serde_json::from_str::<GenerateResponse>(data.trim()) {
        Ok(parsed) => {
            if let Some(text) = parsed.first_text() {
                full_content.push_str(&text);
                on_chunk(StreamChunk {
                    delta: text,
                    done: false,
                });
            }
        }
        Err(e) => tracing::debug!("skipping unparseable stream event: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode, Uri};
    use axum::Router;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    /// Serve `reply` with `status` for any request, recording uri and body.
    async fn fake_service(
        status: StatusCode,
        content_type: &'static str,
        reply: &str,
    ) -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let reply = reply.to_string();

        let app = Router::new().fallback(move |uri: Uri, body: String| {
            let recorded = Arc::clone(&recorded);
            let reply = reply.clone();
            async move {
                recorded.lock().unwrap().push((uri.to_string(), body));
                (status, [(header::CONTENT_TYPE, content_type)], reply)
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), seen)
    }

    /// Serve an event stream whose body arrives as the given separate chunks.
    async fn fake_stream(parts: Vec<Vec<u8>>) -> String {
        let app = Router::new().fallback(move || {
            let parts = parts.clone();
            async move {
                let body = futures::stream::iter(parts).then(|part| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok::<_, std::io::Error>(part)
                });
                (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    Body::from_stream(body),
                )
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".into(),
            base_url,
            model: "gemini-1.5-pro".into(),
        })
    }

    #[tokio::test]
    async fn test_generate_extracts_first_candidate_text() {
        let reply = r#"{"candidates":[{"content":{"parts":[{"text":"Paris"},{"text":"ignored"}]}},{"content":{"parts":[{"text":"other"}]}}]}"#;
        let (base_url, seen) = fake_service(StatusCode::OK, "application/json", reply).await;

        let answer = client(base_url).generate("Q: capital?\nA:").await.unwrap();
        assert_eq!(answer.as_deref(), Some("Paris"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (uri, body) = &seen[0];
        assert_eq!(uri, "/v1/models/gemini-1.5-pro:generateContent?key=test-key");
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "models/gemini-1.5-pro",
                "contents": [{ "parts": [{ "text": "Q: capital?\nA:" }] }],
            })
        );
    }

    #[tokio::test]
    async fn test_missing_answer_path_is_none() {
        for reply in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#,
        ] {
            let (base_url, _) = fake_service(StatusCode::OK, "application/json", reply).await;
            let answer = client(base_url).generate("prompt").await.unwrap();
            assert_eq!(answer, None, "reply: {reply}");
        }
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let (base_url, _) =
            fake_service(StatusCode::FORBIDDEN, "application/json", r#"{"error":"bad key"}"#).await;
        match client(base_url).generate("prompt").await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("bad key"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (base_url, _) = fake_service(StatusCode::OK, "application/json", "<html>").await;
        let result = client(base_url).generate("prompt").await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(format!("http://{addr}/v1")).generate("prompt").await;
        assert!(matches!(result, Err(LlmError::Http(_))));
    }

    #[tokio::test]
    async fn test_stream_accumulates_chunks() {
        let reply = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}",
        );
        let (base_url, seen) = fake_service(StatusCode::OK, "text/event-stream", reply).await;

        let chunks = Mutex::new(Vec::new());
        let answer = client(base_url)
            .generate_stream("prompt", &|chunk| chunks.lock().unwrap().push(chunk))
            .await
            .unwrap();

        assert_eq!(answer.as_deref(), Some("Hello"));
        let chunks = chunks.into_inner().unwrap();
        let deltas: Vec<&str> = chunks.iter().map(|c| c.delta.as_str()).collect();
        assert_eq!(deltas, vec!["Hel", "lo", ""]);
        assert!(chunks.last().unwrap().done);

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].0,
            "/v1/models/gemini-1.5-pro:streamGenerateContent?alt=sse&key=test-key"
        );
    }

    #[tokio::test]
    async fn test_stream_without_text_is_none() {
        let reply = "data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n";
        let (base_url, _) = fake_service(StatusCode::OK, "text/event-stream", reply).await;
        let answer = client(base_url)
            .generate_stream("prompt", &|_| {})
            .await
            .unwrap();
        assert_eq!(answer, None);
    }

    #[tokio::test]
    async fn test_stream_character_split_across_chunks() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café\"}]}}]}\n\n";
        let bytes = event.as_bytes();
        // Split between the two bytes of 'é'.
        let split = event.find('é').unwrap() + 1;
        let base_url = fake_stream(vec![bytes[..split].to_vec(), bytes[split..].to_vec()]).await;

        let answer = client(base_url)
            .generate_stream("prompt", &|_| {})
            .await
            .unwrap();
        assert_eq!(answer.as_deref(), Some("café"));
    }

    #[tokio::test]
    async fn test_api_key_is_query_encoded() {
        let reply = r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#;
        let (base_url, seen) = fake_service(StatusCode::OK, "application/json", reply).await;
        let client = GeminiClient::new(GeminiConfig {
            api_key: "a&b=c".into(),
            base_url,
            model: "gemini-1.5-pro".into(),
        });

        client.generate("prompt").await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0].0,
            "/v1/models/gemini-1.5-pro:generateContent?key=a%26b%3Dc"
        );
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client(format!("http://{addr}/v1"));

        let err = client.generate("prompt").await.unwrap_err();
        assert!(!err.to_string().contains("test-key"), "{err}");

        let err = client.generate_stream("prompt", &|_| {}).await.unwrap_err();
        assert!(!err.to_string().contains("test-key"), "{err}");
        assert!(!format!("{err:?}").contains("test-key"), "{err:?}");
    }
}
