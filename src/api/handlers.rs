//! HTTP endpoint handlers

use std::sync::{atomic::Ordering, Arc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info, warn};

use crate::{
    error::CountdownError,
    state::{AppState, CountdownDuration},
};
use super::responses::{
    ErrorResponse, HealthResponse, MountRequest, StatusResponse, TimerResponse,
};

/// Handler error: a status code plus a JSON body describing it
pub struct ApiError(StatusCode, String);

impl From<CountdownError> for ApiError {
    fn from(e: CountdownError) -> Self {
        let status = match &e {
            CountdownError::TimerNotFound(_) => StatusCode::NOT_FOUND,
            CountdownError::InvalidKey(_) | CountdownError::InvalidDuration(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => {
                error!("Timer operation failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse::new(self.1))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Handle GET /timers - List every mounted timer
pub async fn list_timers_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<TimerResponse>> {
    let timers = state.list()?;
    Ok(Json(
        timers
            .into_iter()
            .map(|timer| TimerResponse::new("Mounted".to_string(), timer))
            .collect(),
    ))
}

/// Handle PUT /timers/:key - Mount a timer, resuming any stored deadline
pub async fn mount_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<MountRequest>,
) -> ApiResult<TimerResponse> {
    let duration = CountdownDuration::from_secs(request.duration_seconds)?;
    let timer = state.mount(&key, duration)?;
    info!("Mount endpoint called for {}", key);
    Ok(Json(TimerResponse::new(
        format!("Timer {} mounted", key),
        timer,
    )))
}

/// Handle GET /timers/:key - Current render data for one timer
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<TimerResponse> {
    let timer = state.snapshot(&key)?;
    Ok(Json(TimerResponse::new(
        format!("{} remaining", timer.display),
        timer,
    )))
}

/// Handle DELETE /timers/:key - Stop ticking, keep the stored deadline
pub async fn unmount_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.unmount(&key).await?;
    info!("Unmount endpoint called for {}", key);
    Ok(StatusCode::NO_CONTENT)
}

/// Handle POST /timers/:key/dismiss - Close the open modal
pub async fn dismiss_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<TimerResponse> {
    let timer = state.dismiss(&key).await?;
    Ok(Json(TimerResponse::new(
        format!("Timer {} modal dismissed", key),
        timer,
    )))
}

/// Handle POST /timers/:key/restart - Discard the deadline and start a new window
pub async fn restart_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<TimerResponse> {
    let timer = state.restart(&key).await.map_err(|e| {
        warn!("Failed to restart {}: {}", key, e);
        e
    })?;
    Ok(Json(TimerResponse::new(
        format!("Timer {} restarted", key),
        timer,
    )))
}

/// Handle GET /status - Return current host status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let timers = state.list()?;
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timers,
        expirations: state.expirations.load(Ordering::SeqCst),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
