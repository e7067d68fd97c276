//! REST endpoints the UI shell drives the tour through, plus a WebSocket
//! that streams toasts to it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::catalog::HOME_ROUTE;
use super::controller::TourController;
use super::service::TourService;
use super::state::TourEvent;
use super::step::DeviceClass;
use super::view::TourView;
use crate::error::TourError;
use crate::notify::{BroadcastNotifier, Toast};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct TourAppState {
    pub service: Arc<TourService>,
    /// Toast fan-out the WebSocket clients subscribe to.
    pub toasts: Arc<BroadcastNotifier>,
}

#[derive(Debug, Deserialize)]
struct TourQuery {
    route: Option<String>,
    device: Option<DeviceClass>,
}

impl TourQuery {
    fn route(&self) -> &str {
        self.route.as_deref().unwrap_or(HOME_ROUTE)
    }
}

#[derive(Debug, Deserialize)]
struct DeviceRequest {
    device: DeviceClass,
}

/// Button presses a client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Next,
    Prev,
    Complete,
    Close,
    Review,
    Restart,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "next" => Some(Self::Next),
            "prev" => Some(Self::Prev),
            "complete" => Some(Self::Complete),
            "close" => Some(Self::Close),
            "review" => Some(Self::Review),
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }
}

/// Build the tour REST and WebSocket routes.
pub fn tour_routes(service: Arc<TourService>, toasts: Arc<BroadcastNotifier>) -> Router {
    let state = TourAppState { service, toasts };

    Router::new()
        .route("/health", get(health))
        .route("/ws/toasts", get(toast_ws_handler))
        .route("/api/tour", get(get_tour))
        .route("/api/tour/device", post(set_device))
        .route("/api/tour/{action}", post(apply_action))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "onboarding-tour"
    }))
}

// ── Toasts ──────────────────────────────────────────────────────────────

async fn toast_ws_handler(ws: WebSocketUpgrade, State(state): State<TourAppState>) -> impl IntoResponse {
    // Subscribe before the handshake completes so no toast slips past
    let rx = state.toasts.subscribe();
    ws.on_upgrade(move |socket| stream_toasts(socket, rx))
}

/// Forward every toast to one client until it disconnects.
async fn stream_toasts(mut socket: WebSocket, mut rx: broadcast::Receiver<Toast>) {
    info!("Toast client connected");

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(toast) => {
                        if let Ok(json) = serde_json::to_string(&toast)
                            && socket.send(Message::Text(json.into())).await.is_err()
                        {
                            debug!("Toast client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        // Stale toasts are not worth replaying
                        warn!(missed = n, "Toast client lagged behind broadcast");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "Toast WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Toast client disconnected");
}

// ── Tour ────────────────────────────────────────────────────────────────

/// Mounted tour for the query, or the response to send instead.
async fn resolve(
    service: &TourService,
    query: &TourQuery,
) -> Result<Arc<TourController>, Response> {
    let device = query.device.unwrap_or_default();
    match service.tour(query.route(), device).await {
        Ok(tour) => Ok(tour),
        Err(TourError::EmptyStepList { route }) => {
            debug!(route = %route, "No tour for route");
            Err(Json(TourView::Hidden).into_response())
        }
        Err(e) => {
            warn!(error = %e, "Tour lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response())
        }
    }
}

/// GET /api/tour?route=/&device=mobile
///
/// Current view. A `device` that differs from the tour's is applied first.
async fn get_tour(State(state): State<TourAppState>, Query(query): Query<TourQuery>) -> Response {
    let tour = match resolve(&state.service, &query).await {
        Ok(tour) => tour,
        Err(resp) => return resp,
    };

    if let Some(device) = query.device
        && tour.snapshot().await.device != device
    {
        return Json(tour.dispatch(TourEvent::DeviceChanged(device)).await).into_response();
    }
    Json(tour.view().await).into_response()
}

/// POST /api/tour/device?route=/
async fn set_device(
    State(state): State<TourAppState>,
    Query(query): Query<TourQuery>,
    Json(body): Json<DeviceRequest>,
) -> Response {
    let tour = match resolve(&state.service, &query).await {
        Ok(tour) => tour,
        Err(resp) => return resp,
    };
    Json(tour.dispatch(TourEvent::DeviceChanged(body.device)).await).into_response()
}

/// POST /api/tour/{action}?route=/
async fn apply_action(
    State(state): State<TourAppState>,
    Path(action): Path<String>,
    Query(query): Query<TourQuery>,
) -> Response {
    let Some(action) = Action::parse(&action) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Unknown tour action: {action}")})),
        )
            .into_response();
    };

    let tour = match resolve(&state.service, &query).await {
        Ok(tour) => tour,
        Err(resp) => return resp,
    };

    let view = match action {
        Action::Next => tour.dispatch(TourEvent::Next).await,
        Action::Prev => tour.dispatch(TourEvent::Prev).await,
        Action::Complete => tour.dispatch(TourEvent::CompleteStep).await,
        Action::Close => tour.dispatch(TourEvent::Close).await,
        Action::Review => tour.dispatch(TourEvent::OpenReview).await,
        Action::Restart => tour.restart().await,
    };
    Json(view).into_response()
}
