//! LINE safety-role bot.
//!
//! Verifies `x-line-signature` on every webhook call, answers text messages
//! and postbacks from a fixed menu vocabulary, and provisions the rich menu
//! the vocabulary belongs to.

pub mod config;
pub mod dispatch;
pub mod line_api;
pub mod richmenu;
pub mod signature;
pub mod types;

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use config::Config;
use line_api::LineApi;
use signature::{verify_signature, SIGNATURE_HEADER};
use types::{HealthResponse, WebhookRequest};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: Arc<dyn LineApi>,
    /// Set once startup provisioning has created the rich menu.
    pub rich_menu_id: Arc<OnceCell<String>>,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn LineApi>) -> Self {
        Self {
            config: Arc::new(config),
            api,
            rich_menu_id: Arc::new(OnceCell::new()),
        }
    }
}

async fn health_check() -> impl IntoResponse {
    let health_response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(health_response))
}

async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Verify against the raw body, before anything is parsed
    let signature_valid = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|signature| {
            verify_signature(&body, signature, &state.config.channel_secret)
        });

    if !signature_valid {
        error!("Rejected webhook: missing or invalid {} header", SIGNATURE_HEADER);
        return (StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let webhook_request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse webhook request: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    if webhook_request.events.is_empty() {
        return (StatusCode::OK, "No events");
    }

    let events = &webhook_request.events;
    let rich_menu_id = state.rich_menu_id.get().map(String::as_str);

    let (report, links) = tokio::join!(
        dispatch::dispatch_events(state.api.as_ref(), events),
        async {
            if state.config.richmenu_link_on_follow {
                dispatch::link_menu_for_followers(state.api.as_ref(), rich_menu_id, events).await
            } else {
                dispatch::LinkReport::default()
            }
        },
    );
    info!(
        "Processed {} events (replied: {}, failed: {}, skipped: {}, menus linked: {}, link failures: {})",
        events.len(),
        report.replied,
        report.failed,
        report.skipped,
        links.linked,
        links.failed
    );

    (StatusCode::OK, "OK")
}

/// Build the router serving the webhook and health checks.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/webhook", get(health_check).post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Provision the configured rich menu, logging instead of failing.
///
/// On success the menu id is kept in `state` so followers can be linked to it.
pub async fn provision_rich_menu(state: AppState) {
    let config = &state.config;
    match richmenu::provision(
        state.api.as_ref(),
        config.richmenu_layout,
        &config.richmenu_image_path,
        &config.richmenu_target,
    )
    .await
    {
        Ok(rich_menu_id) => {
            if state.rich_menu_id.set(rich_menu_id).is_err() {
                warn!("Rich menu already provisioned, keeping the first id");
            }
        }
        Err(e) => error!("Rich menu provisioning failed: {:#}", e),
    }
}
