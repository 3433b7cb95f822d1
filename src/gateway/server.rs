//! HTTP server for the appointment-agent Gateway.
//!
//! | Route | Method | Body |
//! |-------|--------|------|
//! | `/` | GET | liveness banner |
//! | `/health` | GET | status and local timestamp |
//! | `/chat` | POST | `{message, session_id?}` → `{response, session_id}` |
//! | `/sessions` | GET | session summaries |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::session::SessionInfo;
use super::Gateway;
use crate::error::{Error, GatewayError};

/// Chat request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Chat response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

/// Health response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Failure body, `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Session(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

/// Gateway HTTP server.
pub struct GatewayServer {
    gateway: Arc<Gateway>,
}

impl GatewayServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let mut app = Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/chat", post(Self::chat_handler))
            .route("/sessions", get(Self::sessions_handler))
            .layer(TraceLayer::new_for_http());

        if self.gateway.config().server.cors_enabled {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        app.with_state(self.gateway.clone())
    }

    /// Start the server.
    pub async fn start(&self) -> Result<(), GatewayError> {
        let server = &self.gateway.config().server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| GatewayError::ServerError(format!("Invalid address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<(), GatewayError> {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::ServerError(e.to_string()))?;
        tracing::info!("Gateway server listening on {}", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))
    }

    async fn root_handler() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "message": "Appointment Booking AI API is running!" }))
    }

    async fn health_handler(State(gateway): State<Arc<Gateway>>) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: gateway.agent().tools().now().to_rfc3339(),
        })
    }

    async fn chat_handler(
        State(gateway): State<Arc<Gateway>>,
        Json(request): Json<ChatRequest>,
    ) -> Result<Json<ChatResponse>, ApiError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ApiError::bad_request("Message must not be empty"));
        }

        let outcome = gateway
            .process_message(request.session_id.as_deref(), message)
            .await
            .map_err(|e| {
                tracing::error!("Chat request failed: {}", e);
                ApiError::from(e)
            })?;

        Ok(Json(ChatResponse {
            response: outcome.response,
            session_id: outcome.session_id,
        }))
    }

    async fn sessions_handler(State(gateway): State<Arc<Gateway>>) -> Json<Vec<SessionInfo>> {
        Json(gateway.sessions().list().await)
    }
}
