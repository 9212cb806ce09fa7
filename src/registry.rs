//! Entry registry: one submission per round and user, and the time gates
//! on submitting, editing and deleting.
//!
//! Submitting only requires the round not to have ended. Editing and
//! deleting require the round not to have started; once a round is live the
//! existing commitments are frozen.

use crate::error::{EntryError, Resource};
use crate::orm::{entries, rounds};
use crate::round_clock::{round_state, RoundState};
use crate::visibility::Visibility;
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, sea_query::Expr, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Reference to a content item owned by the content service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub post_id: i32,
    pub media_url: String,
}

impl ContentRef {
    pub fn new(post_id: i32, media_url: impl Into<String>) -> Self {
        Self {
            post_id,
            media_url: media_url.into(),
        }
    }

    /// Rejects references the content service could never have issued.
    pub fn validate(&self) -> Result<(), EntryError> {
        if self.post_id <= 0 {
            return Err(EntryError::InvalidContent(format!(
                "post id must be positive, got {}",
                self.post_id
            )));
        }
        if self.media_url.trim().is_empty() {
            return Err(EntryError::InvalidContent(
                "media url must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

pub async fn find_round<C>(conn: &C, round_id: i32) -> Result<rounds::Model, EntryError>
where
    C: ConnectionTrait,
{
    rounds::Entity::find_by_id(round_id)
        .one(conn)
        .await?
        .ok_or(EntryError::NotFound(Resource::Round, round_id))
}

pub async fn find_entry<C>(conn: &C, entry_id: i32) -> Result<entries::Model, EntryError>
where
    C: ConnectionTrait,
{
    entries::Entity::find_by_id(entry_id)
        .one(conn)
        .await?
        .ok_or(EntryError::NotFound(Resource::Entry, entry_id))
}

/// The submission slot of a user in a round, if one was ever created.
///
/// A populated row wins over an empty one.
pub async fn find_slot<C>(
    conn: &C,
    round_id: i32,
    user_id: i32,
) -> Result<Option<entries::Model>, EntryError>
where
    C: ConnectionTrait,
{
    let mut slots = entries::Entity::find()
        .filter(entries::Column::RoundId.eq(round_id))
        .filter(entries::Column::UserId.eq(user_id))
        .order_by_asc(entries::Column::Id)
        .all(conn)
        .await?;

    match slots.iter().position(|e| e.is_submitted()) {
        Some(idx) => Ok(Some(slots.swap_remove(idx))),
        None => Ok(slots.into_iter().next()),
    }
}

/// Entries currently pointing at a post.
pub async fn entries_for_post<C>(conn: &C, post_id: i32) -> Result<Vec<entries::Model>, EntryError>
where
    C: ConnectionTrait,
{
    Ok(entries::Entity::find()
        .filter(entries::Column::PostId.eq(post_id))
        .order_by_asc(entries::Column::Id)
        .all(conn)
        .await?)
}

/// Submissions are accepted until the round ends.
pub fn ensure_open(round: &rounds::Model, now: NaiveDateTime) -> Result<RoundState, EntryError> {
    match round_state(round, now) {
        RoundState::Ended => Err(EntryError::RoundEnded { round_id: round.id }),
        state => Ok(state),
    }
}

/// Existing entries may only change before the round starts.
pub fn ensure_editable(round: &rounds::Model, now: NaiveDateTime) -> Result<(), EntryError> {
    match round_state(round, now) {
        RoundState::Upcoming => Ok(()),
        _ => Err(EntryError::RoundLocked { round_id: round.id }),
    }
}

/// Records a submission in the user's slot for the round.
///
/// Creates the slot on first submission and fills an empty one otherwise.
/// A slot that already holds a submission is rejected; changes go through
/// [`replace_content`].
pub async fn submit<C>(
    conn: &C,
    round: &rounds::Model,
    user_id: i32,
    content: &ContentRef,
    now: NaiveDateTime,
) -> Result<entries::Model, EntryError>
where
    C: ConnectionTrait,
{
    let state = ensure_open(round, now)?;
    let visibility = Visibility::project(true, state);
    let duplicate = || EntryError::DuplicateSubmission {
        round_id: round.id,
        user_id,
    };

    let entry = match find_slot(conn, round.id, user_id).await? {
        Some(slot) if slot.is_submitted() => return Err(duplicate()),
        Some(slot) => {
            // Only fill the slot if it is still empty when we write
            let res = entries::Entity::update_many()
                .col_expr(entries::Column::PostId, Expr::value(content.post_id))
                .col_expr(
                    entries::Column::MediaUrl,
                    Expr::value(content.media_url.clone()),
                )
                .col_expr(
                    entries::Column::VisibleInCompetitionFeed,
                    Expr::value(visibility.competition_feed),
                )
                .col_expr(
                    entries::Column::VisibleInNormalFeed,
                    Expr::value(visibility.normal_feed),
                )
                .col_expr(entries::Column::UpdatedAt, Expr::value(now))
                .filter(entries::Column::Id.eq(slot.id))
                .filter(entries::Column::PostId.is_null())
                .exec(conn)
                .await;
            match res {
                Ok(res) if res.rows_affected == 0 => return Err(duplicate()),
                Ok(_) => return find_entry(conn, slot.id).await,
                Err(e) => Err(e),
            }
        }
        None => {
            let mut active = entries::ActiveModel {
                round_id: Set(round.id),
                user_id: Set(user_id),
                post_id: Set(Some(content.post_id)),
                media_url: Set(Some(content.media_url.clone())),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            visibility.apply_to(&mut active);
            active.insert(conn).await
        }
    };

    // A concurrent submitter can win the race past find_slot; the unique
    // index turns that into a duplicate.
    entry.map_err(|e| match EntryError::from(e) {
        EntryError::DuplicateSubmission { .. } => duplicate(),
        other => other,
    })
}

/// Points a submitted entry at new content. Caller has checked the gate.
pub async fn replace_content<C>(
    conn: &C,
    entry: entries::Model,
    content: &ContentRef,
    state: RoundState,
    now: NaiveDateTime,
) -> Result<entries::Model, EntryError>
where
    C: ConnectionTrait,
{
    let mut active: entries::ActiveModel = entry.into();
    active.post_id = Set(Some(content.post_id));
    active.media_url = Set(Some(content.media_url.clone()));
    active.updated_at = Set(now);
    Visibility::project(true, state).apply_to(&mut active);
    Ok(active.update(conn).await?)
}

/// Empties a slot: clears its content and hides it from every feed.
///
/// The row itself is kept so round accounting survives.
pub async fn unlink<C>(
    conn: &C,
    entry: entries::Model,
    now: NaiveDateTime,
) -> Result<entries::Model, EntryError>
where
    C: ConnectionTrait,
{
    let mut active: entries::ActiveModel = entry.into();
    active.post_id = Set(None);
    active.media_url = Set(None);
    active.updated_at = Set(now);
    Visibility::HIDDEN.apply_to(&mut active);
    Ok(active.update(conn).await?)
}
