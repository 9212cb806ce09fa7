//! Entry submission, edit and withdrawal endpoints

use crate::error::EntryError;
use crate::lifecycle::EntryService;
use crate::registry::ContentRef;
use actix_web::{delete, patch, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(submit_entry)
        .service(edit_entry)
        .service(delete_entry)
        .service(withdraw_content);
}

#[derive(Deserialize)]
pub struct SubmitEntryData {
    /// Supplied by the identity service in front of us
    pub user_id: i32,
    pub post_id: i32,
    pub media_url: String,
    #[serde(default)]
    pub sticker_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct EditEntryData {
    pub post_id: i32,
    pub media_url: String,
    #[serde(default)]
    pub sticker_id: Option<i32>,
}

#[derive(Serialize)]
struct WithdrawResponse {
    unlinked: Vec<i32>,
}

#[post("/competitions/{competition_id}/rounds/{round_id}/entries")]
async fn submit_entry(
    service: web::Data<EntryService>,
    path: web::Path<(i32, i32)>,
    form: web::Json<SubmitEntryData>,
) -> Result<HttpResponse, EntryError> {
    let (competition_id, round_id) = path.into_inner();
    let form = form.into_inner();
    let content = ContentRef::new(form.post_id, form.media_url);

    let entry = service
        .submit_entry(
            competition_id,
            round_id,
            form.user_id,
            &content,
            form.sticker_id,
        )
        .await?;

    Ok(HttpResponse::Created().json(entry))
}

#[patch("/entries/{entry_id}")]
async fn edit_entry(
    service: web::Data<EntryService>,
    path: web::Path<i32>,
    form: web::Json<EditEntryData>,
) -> Result<HttpResponse, EntryError> {
    let form = form.into_inner();
    let content = ContentRef::new(form.post_id, form.media_url);

    let entry = service
        .edit_entry(path.into_inner(), &content, form.sticker_id)
        .await?;

    Ok(HttpResponse::Ok().json(entry))
}

#[delete("/entries/{entry_id}")]
async fn delete_entry(
    service: web::Data<EntryService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, EntryError> {
    service.delete_entry(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Called by the content service after it removed a post.
#[post("/content/withdraw")]
async fn withdraw_content(
    service: web::Data<EntryService>,
    form: web::Json<ContentRef>,
) -> Result<HttpResponse, EntryError> {
    let unlinked = service.withdraw_content(&form).await?;
    Ok(HttpResponse::Ok().json(WithdrawResponse { unlinked }))
}
