//! HTTP route handlers for the marketing analyst API.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use uuid::Uuid;

use crate::analysis::core::config::LlmConfig;
use crate::analysis::core::use_case::UseCase;
use crate::analysis::gate::{AnalysisRequest, Gate, prepare};
use crate::analysis::prompt::prompt_budget::{TokenBudget, TokenUsage};
use crate::llm::openai_stream::CompletionClient;
use crate::session::relay::error_message;
use crate::session::shell::gate_message;

use super::state::AppState;

/// Buffered chunks between the completion worker and the response body.
const CHUNK_BUFFER: usize = 32;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/use-cases", get(list_use_cases))
        .route("/api/models", get(list_models))
        .route("/api/tokens", post(measure_tokens))
        .route("/api/analyze", post(analyze))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "marketing-analyst",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Use case DTO.
#[derive(Debug, Serialize)]
pub struct UseCaseDto {
    /// Stable identifier.
    pub id: &'static str,
    /// Selector label.
    pub label: &'static str,
    /// English title.
    pub title: &'static str,
}

impl From<UseCase> for UseCaseDto {
    fn from(use_case: UseCase) -> Self {
        Self {
            id: use_case.as_str(),
            label: use_case.label(),
            title: use_case.title(),
        }
    }
}

async fn list_use_cases() -> Json<Vec<UseCaseDto>> {
    Json(UseCase::ALL.into_iter().map(UseCaseDto::from).collect())
}

/// Model list response.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Model used when a request names none.
    pub default: String,
    /// Selectable models.
    pub models: Vec<String>,
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default: state.default_model().to_string(),
        models: state.config.llm.selectable_models(),
    })
}

/// Token count request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Document text.
    #[serde(default)]
    pub document: String,
    /// Question text.
    #[serde(default)]
    pub question: String,
}

/// Token count response.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Tokens in the document.
    pub document: usize,
    /// Tokens in the question.
    pub question: usize,
    /// Document plus question.
    pub total: usize,
    /// Configured ceiling.
    pub ceiling: usize,
    /// Whether the total passes the ceiling.
    pub within_budget: bool,
}

impl TokenResponse {
    fn new(usage: TokenUsage, budget: TokenBudget) -> Self {
        Self {
            document: usage.document,
            question: usage.question,
            total: usage.total(),
            ceiling: budget.ceiling,
            within_budget: budget.allows(usage),
        }
    }
}

fn resolve_model(state: &AppState, model: Option<String>) -> String {
    model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.default_model().to_string())
}

/// Run CPU-bound request work on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        tracing::error!(%err, "request worker failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "request worker stopped unexpectedly".to_string(),
        )
            .into_response()
    })
}

async fn measure_tokens(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, Response> {
    let usage = off_runtime(move || TokenUsage::measure(&request.document, &request.question)).await?;
    Ok(Json(TokenResponse::new(usage, state.budget)))
}

/// Analysis request body.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// User-supplied API key.
    #[serde(default)]
    pub api_key: String,
    /// Use-case label or identifier; unknown values use the summary template.
    #[serde(default)]
    pub use_case: String,
    /// Document text.
    #[serde(default)]
    pub document: String,
    /// Question text.
    #[serde(default)]
    pub question: String,
    /// Model identifier.
    pub model: Option<String>,
}

/// Gate the request, then stream the completion as `text/plain`.
async fn analyze(State(state): State<Arc<AppState>>, Json(body): Json<AnalyzeRequest>) -> Response {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %run_id);

    async move {
        let model = resolve_model(&state, body.model);
        let request = Arc::new(AnalysisRequest {
            api_key: body.api_key,
            use_case: UseCase::from_label(&body.use_case),
            document: body.document,
            question: body.question,
            model,
        });

        let budget = state.budget;
        let checked = Arc::clone(&request);
        let gate = match off_runtime(move || prepare(&checked, &budget)).await {
            Ok(gate) => gate,
            Err(response) => return response,
        };

        let prompt = match gate {
            Gate::Ready { prompt, usage } => {
                tracing::info!(use_case = request.use_case.as_str(), total = usage.total(), "request accepted");
                prompt
            }
            Gate::OverBudget { usage, .. } => {
                return (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(TokenResponse::new(usage, state.budget)),
                )
                    .into_response();
            }
            other => {
                let status = if other == Gate::MissingApiKey {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                return (status, gate_message(&other).unwrap_or_default()).into_response();
            }
        };

        stream_completion(state.config.llm.clone(), request, prompt).await
    }
    .instrument(span)
    .await
}

async fn stream_completion(
    llm: LlmConfig,
    request: Arc<AnalysisRequest>,
    prompt: String,
) -> Response {
    let (started_tx, started_rx) = oneshot::channel::<Result<(), String>>();
    let (chunk_tx, chunk_rx) = mpsc::channel::<String>(CHUNK_BUFFER);
    let span = tracing::Span::current();

    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        run_completion(&llm, &request, &prompt, started_tx, &chunk_tx);
    });

    match started_rx.await {
        Ok(Ok(())) => {
            let chunks = futures::stream::unfold(chunk_rx, |mut rx| async move {
                rx.recv()
                    .await
                    .map(|chunk| (Ok::<_, std::io::Error>(chunk), rx))
            });
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(chunks),
            )
                .into_response()
        }
        Ok(Err(message)) => (StatusCode::BAD_GATEWAY, message).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "completion worker stopped unexpectedly".to_string(),
        )
            .into_response(),
    }
}

/// Blocking half of a streamed analysis.
///
/// Reports whether the call started, then forwards chunks until the stream ends, fails,
/// or the client goes away.
fn run_completion(
    llm: &LlmConfig,
    request: &AnalysisRequest,
    prompt: &str,
    started: oneshot::Sender<Result<(), String>>,
    chunks: &mpsc::Sender<String>,
) {
    let stream = CompletionClient::new(llm)
        .and_then(|client| client.stream_chat(&request.api_key, &request.model, prompt));

    let stream = match stream {
        Ok(stream) => {
            let _ = started.send(Ok(()));
            stream
        }
        Err(err) => {
            tracing::error!(%err, "completion failed to start");
            let _ = started.send(Err(error_message(&err)));
            return;
        }
    };

    let mut sent = 0_usize;
    for chunk in stream {
        let payload = match chunk {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(%err, sent, "completion failed mid-stream");
                let _ = chunks.blocking_send(format!("\n{}\n", error_message(&err)));
                return;
            }
        };
        if chunks.blocking_send(payload).is_err() {
            tracing::info!(sent, "client disconnected");
            return;
        }
        sent += 1;
    }
    tracing::info!(sent, "completion streamed");
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::core::config::AnalystConfig;

    fn router_with(config: AnalystConfig) -> Router {
        create_router(AppState::new(config))
    }

    async fn send(router: Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get_json(router: Router, uri: &str) -> serde_json::Value {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let json = get_json(router_with(AnalystConfig::default()), "/health").await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_use_cases_are_listed_in_order() {
        let json = get_json(router_with(AnalystConfig::default()), "/api/use-cases").await;
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|u| u["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["summary", "strategy_recommendation", "comparison_evaluation"]);
        assert_eq!(json[0]["label"], "데이터 요약 및 분석");
    }

    #[tokio::test]
    async fn test_models_include_default() {
        let json = get_json(router_with(AnalystConfig::default()), "/api/models").await;
        assert_eq!(json["default"], "gpt-3.5-turbo");
        assert!(json["models"].as_array().unwrap().len() >= 4);
    }

    #[tokio::test]
    async fn test_token_count_reports_budget() {
        let (status, body) = send(
            router_with(AnalystConfig::default()),
            "POST",
            "/api/tokens",
            serde_json::json!({ "document": "a,b\n1,2\n", "question": "What is the trend?" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let tokens: TokenResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(tokens.total, tokens.document + tokens.question);
        assert_eq!(tokens.ceiling, 3000);
        assert!(tokens.within_budget);
    }

    #[tokio::test]
    async fn test_analyze_requires_api_key() {
        let (status, _) = send(
            router_with(AnalystConfig::default()),
            "POST",
            "/api/analyze",
            serde_json::json!({ "document": "a,b\n1,2\n", "question": "trend?" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_document() {
        let (status, body) = send(
            router_with(AnalystConfig::default()),
            "POST",
            "/api/analyze",
            serde_json::json!({ "api_key": "sk-test", "document": "   ", "question": "trend?" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_over_budget_returns_usage() {
        let mut config = AnalystConfig::default();
        config.budget.max_tokens = 2;
        let (status, body) = send(
            router_with(config),
            "POST",
            "/api/analyze",
            serde_json::json!({
                "api_key": "sk-test",
                "use_case": "마케팅 전략 제안",
                "document": "month,sales\n1,100\n2,140\n",
                "question": "Which month grew the most?"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let tokens: TokenResponse = serde_json::from_str(&body).unwrap();
        assert!(!tokens.within_budget);
        assert_eq!(tokens.ceiling, 2);
    }

    const STREAMED_ANSWER: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"3월 매출이 \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"가장 높습니다.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    const FAILING_ANSWER: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"3월 매출이 \"}}]}\n\n",
        "data: {\"error\":{\"message\":\"quota exceeded\"}}\n\n",
    );

    /// Serve `events` as an event stream from a local chat completions endpoint.
    async fn local_provider(events: &'static str) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || async move { ([(header::CONTENT_TYPE, "text/event-stream")], events) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    async fn analyze_against(base_url: String) -> (StatusCode, String, String) {
        let mut config = AnalystConfig::default();
        config.llm.base_url = base_url;
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({
                    "api_key": "sk-test",
                    "document": "month,sales\n1,100\n3,180\n",
                    "question": "Which month sold the most?"
                })
                .to_string(),
            ))
            .unwrap();
        let response = router_with(config).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_analyze_streams_chunks_in_order() {
        let base_url = local_provider(STREAMED_ANSWER).await;
        let (status, content_type, body) = analyze_against(base_url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "text/plain; charset=utf-8");
        assert_eq!(body, "3월 매출이 가장 높습니다.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_mid_stream_failure_is_appended_to_body() {
        let base_url = local_provider(FAILING_ANSWER).await;
        let (status, _, body) = analyze_against(base_url).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("3월 매출이 "));
        assert!(
            body.trim_end()
                .ends_with("오류가 발생했습니다: api error (0): quota exceeded"),
            "{body:?}"
        );
    }

    #[tokio::test]
    async fn test_token_counts_ignore_model_names() {
        let router = router_with(AnalystConfig::default());
        for i in 0..50 {
            let (status, body) = send(
                router.clone(),
                "POST",
                "/api/tokens",
                serde_json::json!({
                    "document": "a,b\n1,2\n",
                    "question": "What is the trend?",
                    "model": format!("house-model-{i}")
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            let tokens: TokenResponse = serde_json::from_str(&body).unwrap();
            assert_eq!((tokens.document, tokens.question), (2, 4));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_work_leaves_the_runtime_free() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        tokio::spawn(async move {
            let _ = tx.send(());
        });
        let answered = off_runtime(move || rx.recv_timeout(std::time::Duration::from_secs(5)).is_ok()).await;
        assert!(matches!(answered, Ok(true)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_a_bad_gateway() {
        let mut config = AnalystConfig::default();
        config.llm.base_url = "http://127.0.0.1:9/v1".to_string();
        config.llm.connect_timeout_secs = 2;
        let (status, body) = send(
            router_with(config),
            "POST",
            "/api/analyze",
            serde_json::json!({
                "api_key": "sk-test",
                "document": "a,b\n1,2\n",
                "question": "What is the trend?"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.starts_with("오류가 발생했습니다: "));
    }
}
