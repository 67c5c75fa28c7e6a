//! HTTP surface: status snapshot, pairing QR page and the send endpoint.

use crate::error::SendError;
use crate::gateway::OutboundGateway;
use crate::session::{SessionManager, SessionState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OutboundGateway>,
    pub session: Arc<SessionManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<OutboundGateway>, session: Arc<SessionManager>) -> Self {
        Self {
            gateway,
            session,
            started_at: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/qr", get(qr))
        .route("/send", post(send))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct RootResponse {
    app: &'static str,
    status: String,
    uptime_secs: u64,
    memory_mb: f64,
    note: &'static str,
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let ready = state.session.is_connected();
    Json(RootResponse {
        app: "wa-gateway",
        status: if ready { "connected" } else { "disconnected" }.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        memory_mb: rss_mb(),
        note: "scan the pairing code at /qr",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    whatsapp: &'static str,
    timestamp: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        whatsapp: if state.session.is_connected() {
            "connected"
        } else {
            "disconnected"
        },
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    ready: bool,
    state: SessionState,
    has_pairing_code: bool,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.session.status().await;
    Json(StatusResponse {
        ready: snapshot.state == SessionState::Connected,
        state: snapshot.state,
        has_pairing_code: snapshot.has_pairing_code,
    })
}

async fn qr(State(state): State<AppState>) -> Response {
    match state.session.pairing_code().await {
        Some(code) => match qr2term::generate_qr_string(&code) {
            Ok(rendered) => Html(qr_page(&rendered)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "QR rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "message": "failed to render QR code" })),
                )
                    .into_response()
            }
        },
        None => {
            let snapshot = state.session.status().await;
            let message = match snapshot.state {
                SessionState::Connected => "already connected, no pairing needed",
                SessionState::Pairing => "pairing code not generated yet, refresh shortly",
                _ => "not pairing, start the service to begin",
            };
            Json(serde_json::json!({
                "qr": null,
                "message": message,
                "status": snapshot.state,
            }))
            .into_response()
        }
    }
}

fn qr_page(rendered: &str) -> String {
    format!(
        "<html>\n<head><title>wa-gateway - pairing</title></head>\n\
         <body style=\"text-align:center; padding:20px;\">\n\
         <h2>Scan with WhatsApp</h2>\n\
         <pre style=\"font-size:10px; line-height:1;\">{rendered}</pre>\n\
         <p>Open WhatsApp &rarr; Settings &rarr; Linked Devices &rarr; Link a Device</p>\n\
         </body>\n</html>"
    )
}

#[derive(Deserialize)]
struct SendRequest {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct SendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<SendResponse>) {
    match state.gateway.send(&req.phone, &req.message).await {
        Ok(delivery) => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                to: Some(delivery.to),
                message: Some("message sent".to_string()),
                error: None,
            }),
        ),
        Err(e) => send_error(&e),
    }
}

fn send_error(err: &SendError) -> (StatusCode, Json<SendResponse>) {
    let code = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        code,
        Json(SendResponse {
            success: false,
            to: None,
            message: None,
            error: Some(format!("{}: {err}", err.kind())),
        }),
    )
}

/// Resident set size in MiB, from /proc. Zero where unavailable.
fn rss_mb() -> f64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(statm) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(pages) = statm
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse::<f64>().ok())
            {
                return (pages * 4096.0 / 1024.0 / 1024.0 * 100.0).round() / 100.0;
            }
        }
    }
    0.0
}
