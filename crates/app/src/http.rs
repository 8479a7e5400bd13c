//! HTTP query interface
//!
//! Snapshot, advance and search routes alongside the TCP event channel.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use famly_core::{ErrorKind, ParticipantId, PlaylistEntry, RoomHandle, VideoLookup};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Header carrying the id the room sent in its `welcome` notice
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

#[derive(Clone)]
pub struct AppState {
    pub room: RoomHandle,
    pub lookup: Arc<dyn VideoLookup>,
}

#[derive(Debug, Serialize)]
struct RoomView {
    videos: Vec<PlaylistEntry>,
    index: Option<usize>,
    start: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct AdvanceView {
    index: Option<usize>,
    start: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/renderRoom", get(render_room))
        .route("/playNext/{length}", patch(play_next))
        .route("/search", get(search))
        .with_state(state)
}

async fn render_room(State(state): State<AppState>) -> Response {
    match state.room.snapshot().await {
        Ok(snapshot) => Json(RoomView {
            videos: snapshot.videos,
            index: snapshot.index,
            start: snapshot.start,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Room snapshot failed");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn play_next(
    State(state): State<AppState>,
    Path(observed_length): Path<usize>,
    headers: HeaderMap,
) -> Response {
    let Some(participant) = headers
        .get(PARTICIPANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(ParticipantId::parse)
    else {
        return (StatusCode::BAD_REQUEST, "missing or invalid participant id").into_response();
    };

    match state.room.advance(participant, observed_length).await {
        Ok(cursor) => Json(AdvanceView {
            index: cursor.index,
            start: cursor.started_at,
        })
        .into_response(),
        Err(e) => match e.kind() {
            ErrorKind::InvalidRequest => {
                debug!(participant = %participant, "Advance refused");
                StatusCode::FORBIDDEN.into_response()
            }
            ErrorKind::AdapterFailure => {
                warn!(error = %e, "Advance failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match state.lookup.search(&params.query).await {
        Ok(videos) => Json(videos).into_response(),
        Err(e) => {
            warn!(query = %params.query, error = %e, "Search failed");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
