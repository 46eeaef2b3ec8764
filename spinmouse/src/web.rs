//! Browser front end for setup and acquisition.
//!
//! The page polls `/status` and `/frame.jpg`. Requests which change anything
//! are forwarded to the session as [UiEvent]s and answered with `202
//! Accepted`, or `409 Conflict` if they do not apply to the current phase.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use spinmouse_ci::TriggerMode;
use tower_http::trace::TraceLayer;

use crate::{
    Result,
    commands::{CameraCommand, UiEvent},
    display::{DisplayReceiver, encode_jpeg},
    frame_counter::Counters,
};

const INDEX_HTML: &str = include_str!("../web/index.html");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Acquisition,
    Finished,
}

/// Session state shown to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct UiStatus {
    pub phase: Phase,
    pub camera: String,
    pub default_experiment_id: String,
    pub trigger_mode: TriggerMode,
    pub image_width: u32,
    pub image_height: u32,
    /// Last problem or result worth telling the operator.
    pub message: Option<String>,
}

impl UiStatus {
    pub fn new(camera: &str, default_experiment_id: &str) -> Self {
        Self {
            phase: Phase::Setup,
            camera: camera.to_string(),
            default_experiment_id: default_experiment_id.to_string(),
            trigger_mode: TriggerMode::Off,
            image_width: 0,
            image_height: 0,
            message: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SharedStatus(Arc<RwLock<UiStatus>>);

impl SharedStatus {
    pub fn new(status: UiStatus) -> Self {
        Self(Arc::new(RwLock::new(status)))
    }

    pub fn get(&self) -> UiStatus {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn modify(&self, f: impl FnOnce(&mut UiStatus)) {
        match self.0.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    status: SharedStatus,
    display: DisplayReceiver,
    events: Sender<UiEvent>,
}

impl AppState {
    pub fn new(status: SharedStatus, display: DisplayReceiver, events: Sender<UiEvent>) -> Self {
        Self {
            status,
            display,
            events,
        }
    }

    /// Forward `event` if the session is in `phase`.
    fn forward(&self, phase: Phase, event: UiEvent) -> Response {
        let current = self.status.get().phase;
        if current != phase {
            return (
                StatusCode::CONFLICT,
                format!("not possible during {current:?} phase"),
            )
                .into_response();
        }
        match self.events.send(event) {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "session ended").into_response(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    status: UiStatus,
    counters: Counters,
    has_image: bool,
}

#[derive(Debug, Deserialize)]
struct ClickRequest {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct TriggerModeRequest {
    enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BeginRequest {
    #[serde(default)]
    experiment_id: Option<String>,
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn status_handler(State(app_state): State<AppState>) -> Json<StatusResponse> {
    let (counters, has_image) = {
        let display = app_state.display.borrow();
        (display.counters, display.image.is_some())
    };
    Json(StatusResponse {
        status: app_state.status.get(),
        counters,
        has_image,
    })
}

async fn frame_handler(State(app_state): State<AppState>) -> Response {
    let image = app_state.display.borrow().image.clone();
    let Some(image) = image else {
        return (StatusCode::NOT_FOUND, "no image yet").into_response();
    };
    match encode_jpeg(&image) {
        Ok(jpeg) => (
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            jpeg,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("encoding preview: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn offset_handler(
    State(app_state): State<AppState>,
    Json(click): Json<ClickRequest>,
) -> Response {
    app_state.forward(
        Phase::Setup,
        UiEvent::Click {
            x: click.x,
            y: click.y,
        },
    )
}

async fn trigger_mode_handler(
    State(app_state): State<AppState>,
    Json(req): Json<TriggerModeRequest>,
) -> Response {
    let mode = TriggerMode::from(req.enabled);
    app_state.forward(
        Phase::Acquisition,
        UiEvent::Camera(CameraCommand::SetTriggerMode(mode)),
    )
}

/// The body is optional: without one, the default experiment ID is used.
async fn begin_handler(State(app_state): State<AppState>, body: axum::body::Bytes) -> Response {
    let req: BeginRequest = if body.is_empty() {
        BeginRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    };
    app_state.forward(Phase::Setup, UiEvent::Begin(req.experiment_id))
}

async fn cancel_handler(State(app_state): State<AppState>) -> Response {
    app_state.forward(Phase::Setup, UiEvent::Cancel)
}

async fn stop_handler(State(app_state): State<AppState>) -> Response {
    app_state.forward(Phase::Acquisition, UiEvent::Stop)
}

pub fn router(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/frame.jpg", get(frame_handler))
        .route("/offset", post(offset_handler))
        .route("/trigger-mode", post(trigger_mode_handler))
        .route("/begin", post(begin_handler))
        .route("/cancel", post(cancel_handler))
        .route("/stop", post(stop_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// The browser UI, served from its own tokio runtime.
pub struct WebServer {
    runtime: tokio::runtime::Runtime,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    serve: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
}

impl WebServer {
    pub fn start(addr: &str, app_state: AppState) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("web")
            .enable_all()
            .build()?;
        let listener = runtime.block_on(tokio::net::TcpListener::bind(addr))?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let router = router(app_state);
        let serve = runtime.spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        tracing::info!("browser UI listening at http://{addr}/");
        println!("Open http://{addr}/ in a web browser.");
        Ok(Self {
            runtime,
            shutdown_tx: Some(shutdown_tx),
            serve: Some(serve),
        })
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.stop_serving()
    }

    fn stop_serving(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(serve) = self.serve.take() else {
            return Ok(());
        };
        let joined = self
            .runtime
            .block_on(async { tokio::time::timeout(SHUTDOWN_TIMEOUT, serve).await });
        match joined {
            Ok(Ok(served)) => served?,
            Ok(Err(e)) => tracing::error!("web server task failed: {e}"),
            Err(_) => tracing::warn!("web server did not shut down in time"),
        }
        tracing::debug!("web server stopped");
        Ok(())
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop_serving() {
            tracing::error!("stopping web server: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_modify() {
        let status = SharedStatus::new(UiStatus::new("SIM0001", "20240131_01_"));
        status.modify(|s| s.phase = Phase::Acquisition);
        assert_eq!(status.get().phase, Phase::Acquisition);
        let json = serde_json::to_value(status.get()).unwrap();
        assert_eq!(json["phase"], "acquisition");
        assert_eq!(json["trigger_mode"], "Off");
    }
}
