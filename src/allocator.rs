//! Sticker usage ledger.
//!
//! Usage is a ledger of soft-deletable rows, never a counter on the sticker.
//! The live count is recomputed on every allocation, so reclaiming twice
//! cannot free a slot twice.
//!
//! Allocation functions take the caller's transaction. On PostgreSQL the
//! sticker row is locked `FOR UPDATE` before counting, which serializes
//! allocators of the same sticker under read committed. SQLite only admits
//! one writer at a time, so the count and insert are already atomic there.

use crate::error::{EntryError, Resource};
use crate::orm::{sticker_usages, stickers};
use chrono::NaiveDateTime;
use moka::sync::Cache;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DbBackend, PaginatorTrait, Statement,
};
use serde::Serialize;
use std::time::Duration;

/// Live usage of a sticker against its ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Capacity {
    pub used: i64,
    pub limit: i32,
}

impl Capacity {
    pub fn remaining(&self) -> i64 {
        (self.limit as i64 - self.used).max(0)
    }
}

/// Loads a sticker, taking a row lock where the backend supports one.
async fn lock_sticker<C>(conn: &C, sticker_id: i32) -> Result<stickers::Model, EntryError>
where
    C: ConnectionTrait,
{
    let sticker = match conn.get_database_backend() {
        DbBackend::Postgres => {
            stickers::Entity::find()
                .from_raw_sql(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    r#"SELECT * FROM "stickers" WHERE "id" = $1 FOR UPDATE"#,
                    vec![sticker_id.into()],
                ))
                .one(conn)
                .await?
        }
        _ => stickers::Entity::find_by_id(sticker_id).one(conn).await?,
    };

    sticker.ok_or(EntryError::NotFound(Resource::Sticker, sticker_id))
}

/// Number of live usages of a sticker.
pub async fn live_count<C>(conn: &C, sticker_id: i32) -> Result<i64, EntryError>
where
    C: ConnectionTrait,
{
    let count = sticker_usages::Entity::find()
        .filter(sticker_usages::Column::StickerId.eq(sticker_id))
        .filter(sticker_usages::Column::IsDeleted.eq(false))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Applies a sticker to a media asset and returns the usage id.
///
/// Re-applying a sticker to media that already holds a live usage of it
/// returns the existing usage without charging another slot.
pub async fn apply_sticker<C>(
    conn: &C,
    sticker_id: i32,
    media_url: &str,
    now: NaiveDateTime,
) -> Result<i32, EntryError>
where
    C: ConnectionTrait,
{
    let sticker = lock_sticker(conn, sticker_id).await?;

    if let Some(existing) = sticker_usages::Entity::find()
        .filter(sticker_usages::Column::StickerId.eq(sticker_id))
        .filter(sticker_usages::Column::MediaUrl.eq(media_url))
        .filter(sticker_usages::Column::IsDeleted.eq(false))
        .one(conn)
        .await?
    {
        log::debug!(
            "Sticker {} already applied to {} as usage {}",
            sticker_id,
            media_url,
            existing.id
        );
        return Ok(existing.id);
    }

    let used = live_count(conn, sticker_id).await?;
    if used >= sticker.usage_limit as i64 {
        log::debug!(
            "Sticker {} exhausted ({} of {} in use)",
            sticker_id,
            used,
            sticker.usage_limit
        );
        return Err(EntryError::ResourceExhausted {
            sticker_id,
            limit: sticker.usage_limit,
        });
    }

    let usage = sticker_usages::ActiveModel {
        sticker_id: Set(sticker_id),
        media_url: Set(media_url.to_owned()),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    log::debug!(
        "Sticker {} applied to {} as usage {} ({} of {} in use)",
        sticker_id,
        media_url,
        usage.id,
        used + 1,
        sticker.usage_limit
    );

    Ok(usage.id)
}

/// Releases the live usage(s) of a sticker on a media asset.
///
/// Returns how many rows were released. Releasing something that is not live
/// is a no-op, so overlapping withdrawal paths may both call this.
pub async fn reclaim<C>(
    conn: &C,
    sticker_id: i32,
    media_url: &str,
    now: NaiveDateTime,
) -> Result<u64, EntryError>
where
    C: ConnectionTrait,
{
    let res = sticker_usages::Entity::update_many()
        .col_expr(sticker_usages::Column::IsDeleted, Expr::value(true))
        .col_expr(sticker_usages::Column::UpdatedAt, Expr::value(now))
        .filter(sticker_usages::Column::StickerId.eq(sticker_id))
        .filter(sticker_usages::Column::MediaUrl.eq(media_url))
        .filter(sticker_usages::Column::IsDeleted.eq(false))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

/// Releases every live usage on a media asset, whatever the sticker.
pub async fn reclaim_media<C>(
    conn: &C,
    media_url: &str,
    now: NaiveDateTime,
) -> Result<u64, EntryError>
where
    C: ConnectionTrait,
{
    let res = sticker_usages::Entity::update_many()
        .col_expr(sticker_usages::Column::IsDeleted, Expr::value(true))
        .col_expr(sticker_usages::Column::UpdatedAt, Expr::value(now))
        .filter(sticker_usages::Column::MediaUrl.eq(media_url))
        .filter(sticker_usages::Column::IsDeleted.eq(false))
        .exec(conn)
        .await?;
    if res.rows_affected > 0 {
        log::debug!(
            "Reclaimed {} sticker usage(s) on {}",
            res.rows_affected,
            media_url
        );
    }
    Ok(res.rows_affected)
}

/// Sticker ids with a live usage on a media asset.
pub async fn live_stickers_on<C>(conn: &C, media_url: &str) -> Result<Vec<i32>, EntryError>
where
    C: ConnectionTrait,
{
    let usages = sticker_usages::Entity::find()
        .filter(sticker_usages::Column::MediaUrl.eq(media_url))
        .filter(sticker_usages::Column::IsDeleted.eq(false))
        .order_by_asc(sticker_usages::Column::Id)
        .all(conn)
        .await?;
    Ok(usages.into_iter().map(|u| u.sticker_id).collect())
}

/// Current usage of a sticker against its ceiling.
pub async fn capacity<C>(conn: &C, sticker_id: i32) -> Result<Capacity, EntryError>
where
    C: ConnectionTrait,
{
    let sticker = stickers::Entity::find_by_id(sticker_id)
        .one(conn)
        .await?
        .ok_or(EntryError::NotFound(Resource::Sticker, sticker_id))?;
    let used = live_count(conn, sticker_id).await?;
    Ok(Capacity {
        used,
        limit: sticker.usage_limit,
    })
}

/// Sticker metadata cache for validation done before a transaction opens.
///
/// Limits read here are advisory only; `apply_sticker` always re-reads the
/// sticker row inside the transaction.
pub struct StickerCatalog {
    cache: Cache<i32, stickers::Model>,
}

impl StickerCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    /// Get sticker metadata, using the cache if available.
    pub async fn get<C>(&self, conn: &C, sticker_id: i32) -> Result<stickers::Model, EntryError>
    where
        C: ConnectionTrait,
    {
        if let Some(cached) = self.cache.get(&sticker_id) {
            return Ok(cached);
        }

        let sticker = stickers::Entity::find_by_id(sticker_id)
            .one(conn)
            .await?
            .ok_or(EntryError::NotFound(Resource::Sticker, sticker_id))?;
        self.cache.insert(sticker_id, sticker.clone());
        Ok(sticker)
    }
}
