use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engine::{self, DependencyCheck, DependencyValidation, ScheduleRequest};
use crate::{
    AutoScheduleOptions, CalendarConfig, CriticalPathSummary, Dependency, GanttRow,
    ResourceAllocation, ScheduleError, ScheduleResult, TaskId,
};

/// Only the request defaults are shared; every call brings its own project data.
#[derive(Clone)]
pub struct AppState {
    defaults: Arc<RwLock<CalendarConfig>>,
}

impl AppState {
    pub fn new(defaults: CalendarConfig) -> Self {
        Self {
            defaults: Arc::new(RwLock::new(defaults)),
        }
    }

    fn prepare(&self, request: ScheduleRequest) -> ScheduleRequest {
        let defaults = AutoScheduleOptions::from_calendar(&self.defaults.read());
        request.or_defaults(&defaults)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CalendarConfig::default())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle: Option<&'a [TaskId]>,
}

#[derive(Debug)]
enum ApiError {
    Engine(ScheduleError),
    Invalid(String),
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        ApiError::Engine(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Engine(err) => {
                let body = Json(ErrorBody {
                    error: err.code(),
                    message: err.to_string(),
                    cycle: err.cycle(),
                });
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                    cycle: None,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DependencyCheckPayload {
    #[serde(flatten)]
    request: ScheduleRequest,
    candidate: Dependency,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/defaults", get(get_defaults).put(update_defaults))
        .route("/gantt", post(gantt))
        .route("/dependencies/validate", post(validate_dependencies))
        .route("/dependencies/check", post(check_dependency))
        .route("/critical-path", post(critical_path))
        .route("/auto-schedule", post(auto_schedule))
        .route("/resource-allocation", post(resource_allocation))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, defaults: CalendarConfig) -> std::io::Result<()> {
    let app = router(AppState::new(defaults));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_defaults(State(state): State<AppState>) -> Json<CalendarConfig> {
    let current = state.defaults.read().clone();
    Json(current)
}

async fn update_defaults(
    State(state): State<AppState>,
    Json(defaults): Json<CalendarConfig>,
) -> Result<Json<CalendarConfig>, ApiError> {
    defaults
        .validate()
        .map_err(|err| ApiError::Invalid(err.to_string()))?;
    *state.defaults.write() = defaults.clone();
    tracing::info!(?defaults, "request defaults updated");
    Ok(Json(defaults))
}

async fn gantt(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Vec<GanttRow>>, ApiError> {
    Ok(Json(engine::gantt(&state.prepare(request))?))
}

async fn validate_dependencies(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<DependencyValidation>, ApiError> {
    Ok(Json(engine::validate_dependencies(&state.prepare(request))?))
}

async fn check_dependency(
    State(state): State<AppState>,
    Json(payload): Json<DependencyCheckPayload>,
) -> Result<Json<DependencyCheck>, ApiError> {
    let request = state.prepare(payload.request);
    Ok(Json(engine::check_dependency(&request, &payload.candidate)?))
}

async fn critical_path(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<CriticalPathSummary>, ApiError> {
    Ok(Json(engine::critical_path(&state.prepare(request))?))
}

async fn auto_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResult>, ApiError> {
    Ok(Json(engine::auto_schedule(&state.prepare(request))?))
}

async fn resource_allocation(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Vec<ResourceAllocation>>, ApiError> {
    Ok(Json(engine::resource_allocation(&state.prepare(request))?))
}
