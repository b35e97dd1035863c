//! HTTP surface for the valuation calculator.
//!
//! Fetches fundamentals through a [`MarketDataProvider`], runs the
//! normalizer and engine, and optionally forwards the result to an
//! [`AssessmentProvider`] for commentary.

mod assessment_routes;
mod config;
mod request_id;
mod valuation_routes;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fundamental_analysis::ValuationEngine;
use llm_client::{ChatClient, LlmAssessor, LlmConfig};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use valuation_core::{AssessmentProvider, MarketDataProvider, ValuationError};
use yahoo_client::{YahooConfig, YahooFinanceClient};

#[derive(Clone)]
pub struct AppState {
    pub market_data: Arc<dyn MarketDataProvider>,
    /// `None` when no LLM credentials are configured.
    pub assessor: Option<Arc<dyn AssessmentProvider>>,
    pub engine: Arc<ValuationEngine>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> String {
        format!("{:#}", self.error)
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "request failed: {:#}", self.error);
        } else {
            tracing::warn!(status = %self.status, "request rejected: {:#}", self.error);
        }
        let body = ApiResponse::<()>::error(self.message());
        (self.status, Json(body)).into_response()
    }
}

/// Map ValuationError to AppError with appropriate status codes.
pub(crate) fn valuation_err(context: &str, e: ValuationError) -> AppError {
    let status = match &e {
        ValuationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ValuationError::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ValuationError::DataFormat(_) | ValuationError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    AppError::with_status(status, anyhow::anyhow!("{context}: {e}"))
}

async fn health() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(valuation_routes::valuation_routes())
        .merge(assessment_routes::assessment_routes())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    base.allow_origin(origins)
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting BuffettIQ API server");
    tracing::info!("  Valuation config: {:?}", config.valuation);

    let market_data = YahooFinanceClient::new(YahooConfig::from_env())?;

    let assessor: Option<Arc<dyn AssessmentProvider>> = match LlmConfig::from_env() {
        Ok(llm_config) => {
            tracing::info!("  LLM model: {} at {}", llm_config.model, llm_config.base_url);
            Some(Arc::new(LlmAssessor::new(ChatClient::new(llm_config)?)))
        }
        Err(e) => {
            tracing::warn!("LLM assessment disabled: {:#}", e);
            None
        }
    };

    let state = AppState {
        market_data: Arc::new(market_data),
        assessor,
        engine: Arc::new(ValuationEngine::with_config(config.valuation)),
    };

    let app = build_router(state, &config);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
