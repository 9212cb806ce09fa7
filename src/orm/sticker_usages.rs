//! SeaORM Entity for sticker_usages table
//!
//! Ledger of sticker applications. Rows are soft-deleted through
//! `is_deleted` and never removed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sticker_usages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sticker_id: i32,
    #[sea_orm(column_type = "Text")]
    pub media_url: String,
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stickers::Entity",
        from = "Column::StickerId",
        to = "super::stickers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Sticker,
}

impl Related<super::stickers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sticker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
