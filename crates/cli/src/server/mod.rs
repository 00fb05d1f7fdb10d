//! HTTP boundary for the answering pipeline.

mod error;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use error::ApiError;
use ragline_core::{AppError, AppResult};
use ragline_knowledge::{AnswerResult, RagPipeline};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Body of `POST /api/ask`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Build the router around a shared pipeline.
pub fn build_router(pipeline: Arc<RagPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/ask", post(ask))
        .with_state(pipeline)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind `host:port`. Accepts hostnames and bare IPv6 addresses.
pub async fn bind(host: &str, port: u16) -> AppResult<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}:{}: {}", host, port, e)))
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(pipeline: Arc<RagPipeline>, host: &str, port: u16) -> AppResult<()> {
    let listener = bind(host, port).await?;
    let addr = listener.local_addr()?;

    tracing::info!("Serving on http://{}", addr);

    axum::serve(listener, build_router(pipeline))
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/ask
async fn ask(
    State(pipeline): State<Arc<RagPipeline>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    let result = pipeline.ask(&request.question).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use ragline_knowledge::{AnswerGenerator, RetrievalResult, Retriever, ScoredChunk};
    use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
    use tower::ServiceExt;

    struct FixedRetriever;

    #[async_trait::async_trait]
    impl Retriever for FixedRetriever {
        async fn search(&self, _query: &str, _k: usize) -> AppResult<Vec<ScoredChunk>> {
            Ok(Vec::new())
        }

        async fn get_context(&self, _query: &str, _k: usize) -> AppResult<RetrievalResult> {
            Ok(RetrievalResult {
                context: "We offer consulting and AI implementation.".to_string(),
                sources: vec!["https://example.com/services".to_string()],
            })
        }
    }

    enum Reply {
        Text(&'static str),
        Down,
    }

    struct ScriptedClient(Reply);

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            match self.0 {
                Reply::Text(text) => Ok(LlmResponse {
                    content: text.to_string(),
                    model: request.model.clone(),
                    usage: LlmUsage::default(),
                }),
                Reply::Down => Err(AppError::ModelInvocation("connection refused".to_string())),
            }
        }
    }

    fn router(reply: Reply) -> Router {
        let generator = AnswerGenerator::new(Arc::new(ScriptedClient(reply)), "test-model");
        let pipeline = RagPipeline::new(Arc::new(FixedRetriever), generator);
        build_router(Arc::new(pipeline))
    }

    fn ask_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = router(Reply::Text("{}"))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let app = router(Reply::Text(
            r#"{"answer": "Consulting.", "sources": ["https://example.com/services"], "confidence": 0.8}"#,
        ));

        let response = app
            .oneshot(ask_request(r#"{"question": "What services does the company offer?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "answer": "Consulting.",
                "sources": ["https://example.com/services"],
                "confidence": 0.8
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_model_output_is_still_200() {
        let response = router(Reply::Text("not json"))
            .oneshot(ask_request(r#"{"question": "What services does the company offer?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], "We offer consulting and AI implementation.");
        assert_eq!(body["confidence"], 0.4);
    }

    #[tokio::test]
    async fn test_short_question_is_400() {
        let response = router(Reply::Text("{}"))
            .oneshot(ask_request(r#"{"question": "hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("at least 3"));
    }

    #[tokio::test]
    async fn test_model_failure_is_502() {
        let response = router(Reply::Down)
            .oneshot(ask_request(r#"{"question": "What services does the company offer?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_missing_question_field_is_rejected() {
        let response = router(Reply::Text("{}"))
            .oneshot(ask_request(r#"{"query": "What services?"}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_bind_accepts_hostname() {
        let listener = bind("localhost", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_accepts_ip_literal() {
        let listener = bind("127.0.0.1", 0).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/ask")
            .header(header::ORIGIN, "https://frontend.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = router(Reply::Text("{}")).oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
