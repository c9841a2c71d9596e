//! HTTP command surface.
//!
//! Thin request/response endpoints over the same state the pump uses. Every
//! handler either returns a small JSON payload or maps its failure to a
//! server-error status with a human-readable message, matching the push
//! channel's viewers' expectations.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tower_http::cors::CorsLayer;

use liveset_core::setlist::jump_target;
use liveset_core::{merge_cues, SelectionError, Setlist};

use crate::relay::{serve_socket, StageMessage};
use crate::state::AppState;
use crate::transport::{TransportError, TransportLink};

/// Failures surfaced to a command caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Build the command surface router.
pub fn router<L: TransportLink>(app: AppState<L>) -> Router {
    Router::new()
        .route("/ws", get(push_channel::<L>))
        .route("/get-tempo", get(get_tempo::<L>))
        .route("/cues", get(get_cues::<L>))
        .route("/start-playing", get(start_playing::<L>))
        .route("/stop-playing", get(stop_playing::<L>))
        .route("/update-cues", post(update_cues::<L>))
        .route("/set-loop-area", post(set_loop_area::<L>))
        .route("/set-selected-song-index", post(set_selected_song_index::<L>))
        .route("/set-is-looped", get(toggle_loop::<L>))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

/// Upgrade to the push channel; each connection gets its own relay
/// subscription.
async fn push_channel<L: TransportLink>(
    State(app): State<AppState<L>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let messages = app.relay.subscribe();
    upgrade.on_upgrade(move |socket| serve_socket(socket, messages))
}

async fn get_tempo<L: TransportLink>(
    State(app): State<AppState<L>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.transport.start().await?;
    let tempo = app.transport.tempo().await?;
    Ok(Json(json!({ "tempo": tempo })))
}

/// Fetch the raw markers, merge them and replace the shared setlist.
async fn get_cues<L: TransportLink>(
    State(app): State<AppState<L>>,
) -> Result<Json<Setlist>, ApiError> {
    app.transport.start().await?;
    let markers = app.transport.markers().await?;
    let setlist = merge_cues(&markers);
    info!(songs = setlist.len(), markers = markers.len(), "setlist merged");
    app.setlist.replace(setlist.clone());
    Ok(Json(setlist))
}

async fn start_playing<L: TransportLink>(
    State(app): State<AppState<L>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.transport.start().await?;
    app.transport.start_playing().await?;
    Ok(Json(json!({ "message": "Playback started" })))
}

async fn stop_playing<L: TransportLink>(
    State(app): State<AppState<L>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.transport.start().await?;
    app.transport.stop_playing().await?;
    Ok(Json(json!({ "message": "Playback stopped" })))
}

#[derive(Debug, Deserialize)]
struct UpdateCuesBody {
    cues: Setlist,
}

/// Wholesale setlist replacement with a client-supplied ordering. Shape is
/// validated by deserialization only; content is the client's business.
async fn update_cues<L: TransportLink>(
    State(app): State<AppState<L>>,
    Json(body): Json<UpdateCuesBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.setlist.replace(body.cues.clone());
    app.relay.send(StageMessage::CuesUpdated { cues: body.cues });
    Ok(Json(json!({ "message": "Cue order updated successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoopAreaBody {
    loop_start: f64,
    loop_length: f64,
}

async fn set_loop_area<L: TransportLink>(
    State(app): State<AppState<L>>,
    Json(body): Json<LoopAreaBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.transport.start().await?;
    app.transport
        .set_loop_region(body.loop_start, body.loop_length)
        .await?;
    Ok(Json(json!({ "message": "Loop region set" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionBody {
    song_index: i64,
    /// `-1` jumps to the song's start.
    part_index: i64,
}

/// Reposition playback to a song or part. Bounds are validated before any
/// transport call.
async fn set_selected_song_index<L: TransportLink>(
    State(app): State<AppState<L>>,
    Json(body): Json<SelectionBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = jump_target(&app.setlist.load(), body.song_index, body.part_index)?;
    app.transport.start().await?;
    app.transport.jump_to(&target).await?;
    Ok(Json(json!({ "message": "Jumped to selection" })))
}

async fn toggle_loop<L: TransportLink>(
    State(app): State<AppState<L>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.transport.start().await?;
    let current = app.transport.loop_enabled().await?;
    app.transport.set_loop_enabled(!current).await?;
    Ok(Json(json!({ "message": "Loop flag toggled" })))
}
