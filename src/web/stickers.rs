//! Sticker application and capacity endpoints

use crate::error::EntryError;
use crate::lifecycle::EntryService;
use crate::registry::ContentRef;
use actix_web::{get, post, web, HttpResponse};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(apply_sticker).service(view_capacity);
}

#[derive(Serialize)]
struct UsageResponse {
    usage_id: i32,
}

#[post("/stickers/{sticker_id}/usages")]
async fn apply_sticker(
    service: web::Data<EntryService>,
    path: web::Path<i32>,
    form: web::Json<ContentRef>,
) -> Result<HttpResponse, EntryError> {
    let usage_id = service
        .apply_sticker_to_content(&form, path.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(UsageResponse { usage_id }))
}

#[get("/stickers/{sticker_id}/capacity")]
async fn view_capacity(
    service: web::Data<EntryService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, EntryError> {
    let capacity = service.sticker_capacity(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(capacity))
}
