//! HTTP front end over the RAG pipeline.

pub mod routes;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::services::RagPipeline;
pub use state::AppState;

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/chat", post(routes::chat))
        .route("/api/ingest", post(routes::ingest))
        .route("/api/sources", get(routes::list_sources))
        .route("/api/sources/:source_id", delete(routes::delete_source))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub struct RagServer {
    addr: SocketAddr,
    state: AppState,
}

impl RagServer {
    pub fn new(addr: SocketAddr, pipeline: RagPipeline) -> Self {
        Self {
            addr,
            state: AppState::new(pipeline),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %listener.local_addr()?, "server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::services::testing::{HashEmbedder, RecordingLlm, SlowEmbedder};
    use crate::services::{
        Answerer, Embedder, FileLoader, NO_ANSWER, Retriever, SqliteVectorIndex, TextChunker,
    };

    fn app_with(embedder: Arc<dyn Embedder>, reply: &str) -> Router {
        let retriever = Retriever::new(
            embedder,
            Arc::new(SqliteVectorIndex::open_in_memory().unwrap()),
            Arc::new(FileLoader::new(1024 * 1024)),
            TextChunker::new(500, 50).unwrap(),
        )
        .with_timeout(Some(std::time::Duration::from_millis(50)));
        let answerer = Answerer::new(Arc::new(RecordingLlm::replying(reply)));
        router(AppState::new(RagPipeline::new(retriever, answerer, 4)))
    }

    fn app() -> Router {
        app_with(Arc::new(HashEmbedder::new(64)), "Docker runs containers.")
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "okay" }));
    }

    #[tokio::test]
    async fn test_chat_on_empty_index() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({ "question": "What is Docker?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], NO_ANSWER);
        assert_eq!(body["sources"], json!([]));
    }

    #[tokio::test]
    async fn test_empty_question_is_bad_request() {
        let response = app()
            .oneshot(json_request("POST", "/api/chat", json!({ "question": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_timeout_is_gateway_timeout() {
        let response = app_with(Arc::new(SlowEmbedder), "unused")
            .oneshot(json_request("POST", "/api/chat", json!({ "question": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_ingest_chat_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("docker.txt"),
            "Docker is a platform for running containers.",
        )
        .unwrap();

        let app = app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                json!({ "path": dir.path() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["sources_ingested"], 1);
        assert_eq!(report["chunks_added"], 1);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({ "question": "What is Docker?" }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["answer"], "Docker runs containers.");
        assert_eq!(body["sources"], json!(["docker.txt"]));

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/sources/docker.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "removed": 1 }));

        let response = app
            .oneshot(Request::get("/api/sources").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_ingest_missing_path() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/ingest",
                json!({ "path": "/no/such/dir" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = app()
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
