use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    state::{DbPool, with_conn},
    tournaments::standings::{
        cache::{CachedTrace, TraceCache},
        compute::{StandingsReport, standings_of_event},
    },
    util_resp::{FailureResponse, StandardResponse},
};

/// Computes the standings of an event. The trace of this computation is
/// returned alongside the standings, and also kept as the event's latest
/// trace.
pub async fn view_standings(
    State(pool): State<DbPool>,
    State(traces): State<TraceCache>,
    Path(event_id): Path<String>,
) -> StandardResponse<Json<StandingsReport>> {
    let report = {
        let event_id = event_id.clone();
        with_conn(&pool, move |conn| standings_of_event(&event_id, conn)).await?
    };

    traces.store(&event_id, report.trace.clone()).await;
    Ok(Json(report))
}

pub async fn view_cached_trace(
    State(traces): State<TraceCache>,
    Path(event_id): Path<String>,
) -> StandardResponse<Json<CachedTrace>> {
    traces.latest(&event_id).await.map(Json).ok_or_else(|| {
        FailureResponse::not_found(format!(
            "no standings have been computed for event {event_id} yet"
        ))
    })
}
