//! SeaORM Entity for user_stats table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(nullable)]
    pub display_name: Option<String>,
    pub total_points: i64,
    pub level: i64,
    pub events_created: i64,
    pub events_attended: i64,
    pub tokens_collected: i64,
    pub achievements_earned: i64,
    pub streak_days: i64,
    pub last_active: DateTime,
    pub joined_at: DateTime,
    #[sea_orm(nullable)]
    pub profile_image_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
