//! SeaORM Entity for user_achievements table
//!
//! One row per (user_id, achievement_id), enforced by a unique index.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_achievements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: DateTime,
    pub progress: i32,
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTime>,
    /// Set once the achievement's points have been added to the user's stats.
    pub credited: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub metadata: Option<String>,
}

/// `achievement_id` carries no foreign key, so clearing the catalog leaves
/// ledger rows in place.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
