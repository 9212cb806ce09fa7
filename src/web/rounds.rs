//! Round state and feed projection endpoints

use crate::error::EntryError;
use crate::lifecycle::EntryService;
use crate::round_clock::RoundState;
use crate::visibility::Feed;
use actix_web::{get, web, HttpResponse};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_round_state).service(view_round_feed);
}

#[derive(Serialize)]
struct RoundStateResponse {
    round_id: i32,
    state: RoundState,
}

#[get("/rounds/{round_id}/state")]
async fn view_round_state(
    service: web::Data<EntryService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, EntryError> {
    let round_id = path.into_inner();
    let state = service.round_state(round_id).await?;
    Ok(HttpResponse::Ok().json(RoundStateResponse { round_id, state }))
}

/// Entries of a round visible in the `competition` or `normal` feed.
#[get("/rounds/{round_id}/feed/{feed}")]
async fn view_round_feed(
    service: web::Data<EntryService>,
    path: web::Path<(i32, String)>,
) -> Result<HttpResponse, EntryError> {
    let (round_id, feed) = path.into_inner();
    let feed: Feed = feed.parse().map_err(|_| EntryError::UnknownFeed(feed))?;

    let entries = service.visible_entries(round_id, feed).await?;
    Ok(HttpResponse::Ok().json(entries))
}
