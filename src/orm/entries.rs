//! SeaORM Entity for entries table
//!
//! One row per (round, user) submission slot. `post_id` references content
//! owned by the content service and is cleared, never the row deleted, when
//! the entry is withdrawn.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub round_id: i32,
    pub user_id: i32,
    pub post_id: Option<i32>,
    /// Media asset carried by the referenced post; sticker usages are keyed on it
    #[sea_orm(column_type = "Text", nullable)]
    pub media_url: Option<String>,
    pub visible_in_competition_feed: bool,
    pub visible_in_normal_feed: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    /// True when the slot currently holds a submission.
    pub fn is_submitted(&self) -> bool {
        self.post_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rounds::Entity",
        from = "Column::RoundId",
        to = "super::rounds::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Round,
}

impl Related<super::rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Round.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
