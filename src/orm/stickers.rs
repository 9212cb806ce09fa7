//! SeaORM Entity for stickers table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stickers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub competition_id: i32,
    #[sea_orm(column_type = "Text")]
    pub image_url: String,
    pub position: String,
    /// Maximum number of live (non-deleted) usages at any instant
    pub usage_limit: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sticker_usages::Entity")]
    StickerUsages,
}

impl Related<super::sticker_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StickerUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
