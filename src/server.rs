//! HTTP shell: serves the dashboard page and the JSON endpoints it calls.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::data::DatasetManifest;
use crate::figure::Figure;
use crate::interaction::{self, ClickEvent, OverviewRequest, View, DEFAULT_WIDGET_ENTITY};
use crate::logging;
use crate::state::{AppState, Config};

const INDEX_HTML: &str = include_str!("dashboard.html");
const WIDGET_SRC_PLACEHOLDER: &str = "{{DEFAULT_WIDGET_SRC}}";

/// Handler error carrying the HTTP status it maps to.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(what: &str) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: format!("unknown {}", what) }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: format!("{:#}", err) }
    }
}

/// Undecodable request bodies keep axum's status but get the JSON error shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetRequest {
    pub click: ClickEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetResponse {
    pub src: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/manifest", get(manifest_handler))
        .route("/api/targets", get(targets_handler))
        .route("/api/figures/:view", get(figure_handler))
        .route("/api/overview", post(overview_handler))
        .route("/api/widget/:view", post(widget_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Load the dataset, bind and serve until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr()))?;
    let state = AppState::load(config)?;
    logging::log_startup(&addr.to_string(), &state.config.data_path.display().to_string());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index_handler() -> Result<Html<String>, ApiError> {
    let src = interaction::widget_url(DEFAULT_WIDGET_ENTITY)?;
    Ok(Html(INDEX_HTML.replace(WIDGET_SRC_PLACEHOLDER, &src)))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn manifest_handler(State(state): State<Arc<AppState>>) -> Json<DatasetManifest> {
    Json(state.dataset.manifest().clone())
}

async fn targets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.dataset.target_names())
}

async fn figure_handler(
    State(state): State<Arc<AppState>>,
    Path(view): Path<String>,
) -> Result<Json<Figure>, ApiError> {
    let view = View::from_name(&view).ok_or_else(|| ApiError::not_found("view"))?;
    Ok(Json(interaction::view_figure(&state.dataset, view)))
}

async fn overview_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OverviewRequest>, JsonRejection>,
) -> Result<Json<Figure>, ApiError> {
    let Json(request) = payload.map_err(|rej| reject("/api/overview", rej.into()))?;
    interaction::overview_figure(&state.dataset, &request)
        .map(Json)
        .map_err(|err| reject("/api/overview", err.into()))
}

async fn widget_handler(
    Path(view): Path<String>,
    payload: Result<Json<WidgetRequest>, JsonRejection>,
) -> Result<Json<WidgetResponse>, ApiError> {
    let Json(request) = payload.map_err(|rej| reject("/api/widget", rej.into()))?;
    let view = View::from_name(&view)
        .filter(View::has_widget)
        .ok_or_else(|| ApiError::not_found("widget"))?;
    interaction::widget_src(view, &request.click)
        .map(|src| Json(WidgetResponse { src }))
        .map_err(|err| reject("/api/widget", err.into()))
}

fn reject(route: &str, api_err: ApiError) -> ApiError {
    logging::log_request_error(route, &api_err.message);
    api_err
}
