//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use chrono::{NaiveDate, NaiveDateTime};
use podium::orm::{entries, rounds, sticker_usages, stickers};
use podium::ContentRef;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// An instant in January 2024, UTC.
pub fn jan(day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .expect("valid date")
        .and_hms_opt(hour, min, sec)
        .expect("valid time")
}

/// Create a round running from `start` to `end`
pub async fn create_round(
    db: &DatabaseConnection,
    competition_id: i32,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<rounds::Model, DbErr> {
    rounds::ActiveModel {
        competition_id: Set(competition_id),
        name: Set(format!("Round starting {}", start)),
        start_date: Set(start),
        end_date: Set(end),
        likes_to_pass: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// The round used by most scenarios: 2024-01-10 to 2024-01-20
pub async fn create_january_round(
    db: &DatabaseConnection,
    competition_id: i32,
) -> Result<rounds::Model, DbErr> {
    create_round(db, competition_id, jan(10, 0, 0, 0), jan(20, 0, 0, 0)).await
}

/// Create a sticker with the given usage limit
pub async fn create_sticker(
    db: &DatabaseConnection,
    competition_id: i32,
    usage_limit: i32,
) -> Result<stickers::Model, DbErr> {
    stickers::ActiveModel {
        competition_id: Set(competition_id),
        image_url: Set("https://cdn.example.com/stickers/gold.png".to_string()),
        position: Set("bottom-right".to_string()),
        usage_limit: Set(usage_limit),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Content reference for a post with a predictable media URL
pub fn content(post_id: i32) -> ContentRef {
    ContentRef::new(post_id, format!("https://media.example.com/{}.jpg", post_id))
}

pub async fn get_entry(db: &DatabaseConnection, id: i32) -> Result<entries::Model, DbErr> {
    entries::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::Custom(format!("entry {} missing", id)))
}

/// Every entry row for a round and user, submitted or not
pub async fn slots_for(
    db: &DatabaseConnection,
    round_id: i32,
    user_id: i32,
) -> Result<Vec<entries::Model>, DbErr> {
    entries::Entity::find()
        .filter(entries::Column::RoundId.eq(round_id))
        .filter(entries::Column::UserId.eq(user_id))
        .all(db)
        .await
}

/// Every ledger row on a media URL, live or not
pub async fn usages_on(
    db: &DatabaseConnection,
    media_url: &str,
) -> Result<Vec<sticker_usages::Model>, DbErr> {
    sticker_usages::Entity::find()
        .filter(sticker_usages::Column::MediaUrl.eq(media_url))
        .order_by_asc(sticker_usages::Column::Id)
        .all(db)
        .await
}
