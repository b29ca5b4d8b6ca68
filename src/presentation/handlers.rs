// HTTP request handlers
use crate::application::auth_service::AuthError;
use crate::application::controller::{ControllerError, PrimaryAction};
use crate::domain::command::{Command, CommandOutcome};
use crate::domain::source::SourceKey;
use crate::domain::status::Mode;
use crate::domain::view::View;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct StreamingBody {
    pub enabled: bool,
}

#[derive(Deserialize, Default)]
pub struct RefreshBody {
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Deserialize)]
pub struct ModeBody {
    pub mode: Mode,
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

fn stopped(err: ControllerError) -> Response {
    tracing::error!("Controller unavailable: {}", err);
    (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.snapshot())
}

pub async fn mount_view(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(view) = View::parse(&name) else {
        return message(StatusCode::NOT_FOUND, format!("Unknown view: {}", name));
    };

    match state.controller.mount(view).await {
        Ok(()) => Json(state.controller.snapshot()).into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn unmount_view(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.unmount().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn set_streaming(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StreamingBody>,
) -> Response {
    match state.controller.set_streaming(body.enabled).await {
        Ok(()) => Json(json!({ "auto_stream": body.enabled })).into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RefreshBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut keys = Vec::with_capacity(body.sources.len());
    for name in &body.sources {
        match SourceKey::parse(name) {
            Some(key) => keys.push(key),
            None => {
                return message(StatusCode::BAD_REQUEST, format!("Unknown source: {}", name));
            }
        }
    }

    match state.controller.refresh(keys).await {
        Ok(issued) => Json(json!({ "issued": issued })).into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn primary_action(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.primary_action().await {
        Ok(PrimaryAction::Refreshed) => Json(json!({ "action": "refreshed" })).into_response(),
        Ok(PrimaryAction::Computed(outcome)) => {
            Json(json!({ "action": "computed", "result": outcome })).into_response()
        }
        Ok(PrimaryAction::Idle) => Json(json!({ "action": "idle" })).into_response(),
        Err(e) => stopped(e),
    }
}

/// Failed commands answer 502 with the outcome as body. Rejections and
/// skips are not failures.
fn outcome_response(outcome: CommandOutcome) -> Response {
    let status = if outcome.is_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(outcome)).into_response()
}

async fn run_command(state: &AppState, command: Command) -> Response {
    match state.controller.dispatch(command).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => stopped(e),
    }
}

pub async fn compute_stats(State(state): State<Arc<AppState>>) -> Response {
    run_command(&state, Command::ComputeStats).await
}

pub async fn generate_data(State(state): State<Arc<AppState>>) -> Response {
    run_command(&state, Command::GenerateData).await
}

pub async fn update_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ModeBody>,
) -> Response {
    run_command(&state, Command::UpdateMode(body.mode)).await
}

pub async fn generate_plot(State(state): State<Arc<AppState>>) -> Response {
    run_command(&state, Command::GeneratePlot).await
}

pub async fn generate_report(State(state): State<Arc<AppState>>) -> Response {
    run_command(&state, Command::GenerateReport).await
}

pub async fn plot_image(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.controller.plot_image(&id).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        Err(e) => {
            tracing::warn!("Plot {} unavailable: {}", id, e);
            message(StatusCode::BAD_GATEWAY, e.user_message())
        }
    }
}

pub async fn open_reset(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.open_reset().await {
        Ok(opened) => Json(json!({ "opened": opened })).into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn cancel_reset(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.cancel_reset().await {
        Ok(cancelled) => Json(json!({ "cancelled": cancelled })).into_response(),
        Err(e) => stopped(e),
    }
}

pub async fn confirm_reset(State(state): State<Arc<AppState>>) -> Response {
    match state.controller.confirm_reset().await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => stopped(e),
    }
}

fn auth_failure(err: AuthError) -> Response {
    let status = match &err {
        AuthError::Rejected(_) => StatusCode::UNAUTHORIZED,
        AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        AuthError::Fetch(_) => StatusCode::BAD_GATEWAY,
    };
    let text = match err {
        AuthError::Fetch(e) => e.user_message(),
        other => other.to_string(),
    };
    message(status, text)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Response {
    match state.auth.register(&body.email, &body.password, &body.name).await {
        Ok(text) => message(StatusCode::OK, text),
        Err(e) => auth_failure(e),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Response {
    match state.auth.login(&body.email, &body.password).await {
        Ok(text) => message(StatusCode::OK, text),
        Err(e) => auth_failure(e),
    }
}

/// The locally stored user, without contacting the auth service.
pub async fn current_user(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "user": state.auth.current_user() }))
}

pub async fn verify(State(state): State<Arc<AppState>>) -> Response {
    match state.auth.verify().await {
        Ok(user) => Json(json!({ "user": user })).into_response(),
        Err(e) => auth_failure(e),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    match state.auth.logout().await {
        Ok(text) => message(StatusCode::OK, text),
        Err(e) => auth_failure(e),
    }
}
