//! HTTP tool server.
//!
//! Exposes the registered tools (by default `crawl_site`, `ask_site` and
//! `scrape_url`) as a JSON API for calling agents.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400) for parameters that fail the schema or
//! the tool's own checks, `not_found` (404) for an unknown tool name, and
//! `tool_error` (500) for anything else a tool raises.
//!
//! `crawl_site`, `ask_site` and `scrape_url` report runtime failures such as
//! a failed fetch inside their `result` text rather than as HTTP errors.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::app::App;
use crate::config::Config;
use crate::tools::{validate_params, ToolContext, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    app: Arc<App>,
    tools: Arc<ToolRegistry>,
}

/// Open the app from `config` and serve the built-in tools on
/// `[server].bind` until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = Arc::new(App::open(config).await?);
    run_server_with_registry(app, Arc::new(ToolRegistry::with_builtins())).await
}

/// Serve a custom tool registry.
///
/// ```rust,no_run
/// use site_harness::app::App;
/// use site_harness::server::run_server_with_registry;
/// use site_harness::tools::ToolRegistry;
/// use std::sync::Arc;
///
/// # async fn example(config: &site_harness::config::Config) -> anyhow::Result<()> {
/// let app = Arc::new(App::open(config).await?);
/// let mut tools = ToolRegistry::with_builtins();
/// // tools.register(Box::new(MyTool));
/// run_server_with_registry(app, Arc::new(tools)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_registry(
    app: Arc<App>,
    tools: Arc<ToolRegistry>,
) -> anyhow::Result<()> {
    let bind_addr = app.config().server.bind.clone();

    for t in tools.tools() {
        tracing::debug!(tool = t.name(), builtin = t.is_builtin(), "registered tool");
    }

    let router = router(app.clone(), tools);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "tool server listening");
    println!("Tool server listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down, cancelling running crawls");
            app.shutdown();
        })
        .await?;

    Ok(())
}

/// Build the router without binding, e.g. to serve it on a test listener.
pub fn router(app: Arc<App>, tools: Arc<ToolRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { app, tools })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map a tool failure to an HTTP status: argument checks are the caller's
/// fault, everything else is the tool's.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = format!("{}: {}", tool_name, err);

    if msg.contains("must not be empty") || msg.contains("invalid") {
        AppError::new(StatusCode::BAD_REQUEST, "bad_request", msg)
    } else {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "tool_error", msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo::of(t.as_ref()))
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state.tools.find(&name).ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no tool registered with name: {}", name),
        )
    })?;

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| AppError::new(StatusCode::BAD_REQUEST, "bad_request", e.to_string()))?;

    tracing::debug!(tool = %name, "tool call");
    let ctx = ToolContext::new(state.app.clone());
    let result = tool
        .execute(params, &ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
