//! SeaORM Entity for events table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub date: DateTime,
    pub creator: String,
    pub token_mint_address: String,
    pub qr_code_data: String,
    #[sea_orm(nullable)]
    pub max_attendees: Option<i32>,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    pub created_at: DateTime,
    /// Claims recorded so far. Bumped in the same transaction as the claim
    /// insert and guarded against `max_attendees`.
    pub claim_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::token_claims::Entity")]
    TokenClaims,
}

impl Related<super::token_claims::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TokenClaims.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
