//! Gemini REST implementation of `ModelBackend`.
//!
//! Endpoints used:
//! - `POST /v1beta/models/{model}:generateContent`
//! - `POST /v1beta/models/{model}:streamGenerateContent?alt=sse`
//! - `POST /upload/v1beta/files` (resumable protocol: `start`, then `upload, finalize`)
//!
//! The key travels in the `x-goog-api-key` header so it never shows up in URLs or logs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::sse::SseDecoder;
use super::{FragmentStream, LlmError, ModelBackend, ModelRequest};
use crate::credentials::ApiKey;
use crate::models::document::FileHandle;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    /// Whole-request limit for unary calls. For streams it bounds the wait for
    /// headers and every gap between body chunks, never the full reply.
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().connect_timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/v1beta/models/{model}:{action}", self.base_url)
    }

    fn content_request(&self, key: &ApiKey, url: &str, request: &ModelRequest) -> RequestBuilder {
        let body = GenerateContentRequest::from_model_request(request);
        self.client
            .post(url)
            .header(API_KEY_HEADER, key.expose())
            .json(&body)
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    async fn generate(&self, key: &ApiKey, request: &ModelRequest) -> Result<String, LlmError> {
        let url = self.model_url(&request.model, "generateContent");
        let response = self
            .content_request(key, &url, request)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let parsed: GenerateContentResponse = response.json().await?;
        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let text = parsed.text();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }

    async fn generate_stream(
        &self,
        key: &ApiKey,
        request: &ModelRequest,
    ) -> Result<FragmentStream, LlmError> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&request.model, "streamGenerateContent")
        );
        let idle = self.timeout;
        let response = tokio::time::timeout(idle, self.content_request(key, &url, request).send())
            .await
            .map_err(|_| LlmError::Timeout(idle))??;
        let response = ensure_success(response).await?;

        let mut decoder = SseDecoder::default();
        let fragments = body_chunks(response, idle)
            .flat_map(move |chunk| {
                let payloads = match chunk {
                    Some(Ok(bytes)) => decoder.feed(&bytes),
                    Some(Err(e)) => return stream::iter(vec![Err(e)]),
                    None => decoder.finish().into_iter().collect(),
                };
                let items: Vec<Result<String, LlmError>> = payloads
                    .iter()
                    .filter_map(|payload| parse_stream_payload(payload).transpose())
                    .collect();
                stream::iter(items)
            })
            .scan(false, |failed, item| {
                // Nothing follows the first error.
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            });

        Ok(fragments.boxed())
    }

    async fn register_file(
        &self,
        key: &ApiKey,
        display_name: &str,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileHandle, LlmError> {
        let bytes = tokio::fs::read(path).await?;

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, key.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .timeout(self.timeout)
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| LlmError::Api {
                status: start.status().as_u16(),
                message: "upload session did not return an upload URL".to_string(),
            })?;

        let finished = self
            .client
            .post(upload_url)
            .header(API_KEY_HEADER, key.expose())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .timeout(self.timeout)
            .send()
            .await?;
        let finished = ensure_success(finished).await?;

        let uploaded: UploadResponse = finished.json().await?;
        if uploaded.file.state.as_deref() == Some("FAILED") {
            return Err(LlmError::Api {
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                message: format!("provider failed to process {}", uploaded.file.name),
            });
        }

        debug!("Registered file {} as {}", display_name, uploaded.file.name);

        Ok(FileHandle {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_model_request(request: &'a ModelRequest) -> Self {
        let mut parts: Vec<Part<'a>> = request
            .documents
            .iter()
            .map(|doc| Part::FileData {
                file_data: FileData {
                    mime_type: &doc.mime_type,
                    file_uri: &doc.uri,
                },
            })
            .collect();
        parts.push(Part::Text {
            text: &request.prompt,
        });

        let tools = if request.search_grant {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
            tools,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenates every text part of the first candidate. Grounded answers may be
    /// split into several parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFileInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileInfo {
    name: String,
    uri: String,
    mime_type: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Response handling
// ────────────────────────────────────────────────────────────────────────────

/// Body chunks of a streamed response, followed by a single `None` once the body is
/// complete. A transport error or a gap longer than `idle` yields one `Err` and ends
/// the stream.
fn body_chunks(
    response: Response,
    idle: Duration,
) -> impl Stream<Item = Option<Result<Bytes, LlmError>>> + Send {
    stream::unfold(Some(response.bytes_stream().boxed()), move |body| async move {
        let mut body = body?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(Ok(bytes))) => Some((Some(Ok(bytes)), Some(body))),
            Ok(Some(Err(e))) => Some((Some(Err(LlmError::Http(e))), None)),
            Ok(None) => Some((None, None)),
            Err(_) => {
                warn!("Gemini stream idle for more than {:?}", idle);
                Some((Some(Err(LlmError::Timeout(idle))), None))
            }
        }
    })
}

async fn ensure_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    warn!("Gemini API returned {}", status);
    Err(map_http_error(status, &body, retry_after))
}

/// Classifies a non-success response into transport, authentication or rate-limit failures.
fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> LlmError {
    let parsed = serde_json::from_str::<ErrorWrapper>(body).ok();
    let status_text = parsed
        .as_ref()
        .and_then(|w| w.error.status.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|w| w.error.message)
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || status_text == "RESOURCE_EXHAUSTED" {
        return LlmError::RateLimited {
            retry_after,
            message,
        };
    }

    let auth_rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || status_text == "UNAUTHENTICATED"
        || status_text == "PERMISSION_DENIED"
        || body.contains("API_KEY_INVALID");
    if auth_rejected {
        return LlmError::Authentication {
            status: status.as_u16(),
            message,
        };
    }

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value: &HeaderValue = headers.get(reqwest::header::RETRY_AFTER)?;
    value
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Turns one SSE payload into a text fragment. Chunks without text (e.g. the final
/// usage-only chunk) yield `None`; error payloads sent mid-stream become errors.
fn parse_stream_payload(payload: &str) -> Result<Option<String>, LlmError> {
    if payload.trim().is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(payload)?;
    if value.get("error").is_some() {
        let wrapper: ErrorWrapper = serde_json::from_value(value)?;
        let status = wrapper
            .error
            .code
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err(map_http_error(status, payload, None));
    }

    let chunk: GenerateContentResponse = serde_json::from_value(value)?;
    let text = chunk.text();
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::extract::{Path as UrlPath, State};
    use axum::http::{header, HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::llm_client::prompts::POLICY;

    fn request(prompt: &str) -> ModelRequest {
        ModelRequest {
            model: "gemini-test".to_string(),
            system_instruction: POLICY.text.to_string(),
            prompt: prompt.to_string(),
            documents: vec![],
            temperature: 0.1,
            search_grant: true,
        }
    }

    fn key() -> ApiKey {
        ApiKey::parse("test-key").unwrap()
    }

    #[derive(Clone, Default)]
    struct FakeProvider {
        bodies: Arc<Mutex<Vec<Value>>>,
        keys: Arc<Mutex<Vec<String>>>,
    }

    async fn fake_models(
        State(fake): State<FakeProvider>,
        UrlPath(action): UrlPath<String>,
        headers: AxumHeaders,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        let prompt = body["contents"][0]["parts"]
            .as_array()
            .and_then(|parts| parts.last())
            .and_then(|p| p["text"].as_str())
            .unwrap_or_default()
            .to_string();
        fake.bodies.lock().unwrap().push(body);
        if let Some(k) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            fake.keys.lock().unwrap().push(k.to_string());
        }

        match prompt.as_str() {
            "rate" => (
                AxumStatus::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "7")],
                Json(json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}})),
            )
                .into_response(),
            "badkey" => (
                AxumStatus::BAD_REQUEST,
                Json(json!({"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT",
                    "details": [{"reason": "API_KEY_INVALID"}]}})),
            )
                .into_response(),
            // Five frames 100 ms apart: slower overall than the client timeout.
            "slow" => {
                let frames = stream::iter(0..5).then(|i| async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<_, std::io::Error>(sse_frame(&format!("f{i}")))
                });
                event_stream(Body::from_stream(frames))
            }
            // Two frames, then the connection stays open without sending anything.
            "stall" => {
                let frames = stream::iter(vec![
                    Ok::<_, std::io::Error>(sse_frame("A")),
                    Ok(sse_frame("B")),
                ])
                .chain(stream::pending());
                event_stream(Body::from_stream(frames))
            }
            _ if action.ends_with(":streamGenerateContent") => {
                let frames: String = ["A", "B", "C"].iter().map(|t| sse_frame(t)).collect();
                event_stream(Body::from(frames))
            }
            _ => Json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "第一段"}, {"text": "第二段"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
            }))
            .into_response(),
        }
    }

    fn sse_frame(text: &str) -> String {
        format!(
            "data: {}\r\n\r\n",
            json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
        )
    }

    fn event_stream(body: Body) -> AxumResponse {
        ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
    }

    async fn fake_upload_start(headers: AxumHeaders) -> AxumResponse {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (
            [(UPLOAD_URL_HEADER, format!("http://{host}/upload-session/1"))],
            Json(json!({})),
        )
            .into_response()
    }

    async fn fake_upload_finish(headers: AxumHeaders, body: bytes::Bytes) -> AxumResponse {
        assert_eq!(
            headers.get("x-goog-upload-command").unwrap(),
            "upload, finalize"
        );
        Json(json!({"file": {
            "name": "files/abc",
            "uri": "https://files.example/abc",
            "mimeType": "application/pdf",
            "state": "ACTIVE",
            "sizeBytes": body.len().to_string()
        }}))
        .into_response()
    }

    async fn spawn_fake() -> (GeminiClient, FakeProvider) {
        spawn_fake_with_timeout(Duration::from_secs(5)).await
    }

    async fn spawn_fake_with_timeout(timeout: Duration) -> (GeminiClient, FakeProvider) {
        let fake = FakeProvider::default();
        let app = Router::new()
            .route("/v1beta/models/:action", post(fake_models))
            .route("/upload/v1beta/files", post(fake_upload_start))
            .route("/upload-session/1", post(fake_upload_finish))
            .with_state(fake.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GeminiClient::new(format!("http://{addr}/"), timeout).unwrap();
        (client, fake)
    }

    #[test]
    fn test_request_body_carries_policy_verbatim() {
        let mut req = request("TWK10 有人體試驗嗎？");
        req.documents.push(FileHandle {
            name: "files/1".to_string(),
            uri: "https://files.example/1".to_string(),
            mime_type: "application/pdf".to_string(),
        });
        let body = serde_json::to_value(GenerateContentRequest::from_model_request(&req)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], POLICY.text);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["contents"][0]["parts"][0]["fileData"]["fileUri"],
            "https://files.example/1"
        );
        assert_eq!(body["contents"][0]["parts"][1]["text"], "TWK10 有人體試驗嗎？");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(body["tools"][0]["google_search"], json!({}));
    }

    #[test]
    fn test_tools_omitted_without_search_grant() {
        let mut req = request("q");
        req.search_grant = false;
        let body = serde_json::to_value(GenerateContentRequest::from_model_request(&req)).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_map_http_error_classification() {
        let rate = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "{}",
            Some(Duration::from_secs(3)),
        );
        assert!(matches!(
            rate,
            LlmError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(3)
        ));

        let exhausted = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"m","status":"RESOURCE_EXHAUSTED"}}"#,
            None,
        );
        assert!(matches!(exhausted, LlmError::RateLimited { .. }));

        let auth = map_http_error(StatusCode::FORBIDDEN, "denied", None);
        assert!(matches!(auth, LlmError::Authentication { status: 403, .. }));

        let other = map_http_error(StatusCode::BAD_GATEWAY, "upstream", None);
        assert!(matches!(other, LlmError::Api { status: 502, .. }));
    }

    #[test]
    fn test_parse_stream_payload() {
        let text = parse_stream_payload(
            r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(text.as_deref(), Some("hi"));

        let usage_only =
            parse_stream_payload(r#"{"usageMetadata":{"promptTokenCount":1}}"#).unwrap();
        assert!(usage_only.is_none());

        let err = parse_stream_payload(
            r#"{"error":{"code":429,"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(err, Err(LlmError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_generate_concatenates_text_parts() {
        let (client, fake) = spawn_fake().await;
        let text = client.generate(&key(), &request("hello")).await.unwrap();
        assert_eq!(text, "第一段第二段");

        let bodies = fake.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["systemInstruction"]["parts"][0]["text"], POLICY.text);
        assert_eq!(fake.keys.lock().unwrap()[0], "test-key");
    }

    #[tokio::test]
    async fn test_generate_maps_rate_limit_with_retry_after() {
        let (client, _fake) = spawn_fake().await;
        let err = client.generate(&key(), &request("rate")).await.unwrap_err();
        match err {
            LlmError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)))
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_maps_invalid_key_to_authentication() {
        let (client, _fake) = spawn_fake().await;
        let err = client.generate(&key(), &request("badkey")).await.unwrap_err();
        assert!(matches!(err, LlmError::Authentication { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_generate_stream_yields_fragments_in_order() {
        let (client, _fake) = spawn_fake().await;
        let stream = client
            .generate_stream(&key(), &request("stream please"))
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_stream_may_outlast_request_timeout() {
        let (client, _fake) = spawn_fake_with_timeout(Duration::from_millis(300)).await;
        let stream = client
            .generate_stream(&key(), &request("slow"))
            .await
            .unwrap();
        let items: Vec<Result<String, LlmError>> = stream.collect().await;

        let fragments: Vec<String> = items.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec!["f0", "f1", "f2", "f3", "f4"]);
    }

    #[tokio::test]
    async fn test_stalled_stream_yields_one_error_then_ends() {
        let (client, _fake) = spawn_fake_with_timeout(Duration::from_millis(200)).await;
        let stream = client
            .generate_stream(&key(), &request("stall"))
            .await
            .unwrap();
        let items: Vec<Result<String, LlmError>> = stream.collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_deref().unwrap(), "A");
        assert_eq!(items[1].as_deref().unwrap(), "B");
        assert!(matches!(items[2], Err(LlmError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_register_file_runs_resumable_upload() {
        let (client, _fake) = spawn_fake().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let handle = client
            .register_file(&key(), "paper.pdf", &path, "application/pdf")
            .await
            .unwrap();
        assert_eq!(handle.name, "files/abc");
        assert_eq!(handle.uri, "https://files.example/abc");
        assert_eq!(handle.mime_type, "application/pdf");
    }
}
