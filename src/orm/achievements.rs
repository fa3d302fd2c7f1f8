//! SeaORM Entity for achievements table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "achievements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub achievement_type: AchievementType,
    pub category: AchievementCategory,
    pub badge_image_url: String,
    pub points: i32,
    pub rarity: AchievementRarity,
    pub requirement_type: RequirementType,
    pub requirement_value: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub requirement_details: Option<String>,
    pub created_at: DateTime,
}

/// Which side of an event an achievement rewards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum AchievementType {
    #[sea_orm(string_value = "creator")]
    Creator,
    #[sea_orm(string_value = "participant")]
    Participant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    #[sea_orm(string_value = "attendance")]
    Attendance,
    #[sea_orm(string_value = "creation")]
    Creation,
    #[sea_orm(string_value = "social")]
    Social,
    #[sea_orm(string_value = "collection")]
    Collection,
    #[sea_orm(string_value = "special")]
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "lowercase")]
pub enum AchievementRarity {
    #[sea_orm(string_value = "common")]
    Common,
    #[sea_orm(string_value = "uncommon")]
    Uncommon,
    #[sea_orm(string_value = "rare")]
    Rare,
    #[sea_orm(string_value = "epic")]
    Epic,
    #[sea_orm(string_value = "legendary")]
    Legendary,
}

/// Evaluation strategy of an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum RequirementType {
    #[sea_orm(string_value = "count")]
    #[serde(rename = "count")]
    Count,
    #[sea_orm(string_value = "streak")]
    #[serde(rename = "streak")]
    Streak,
    /// Time-limited; no rule is implemented for it yet.
    #[sea_orm(string_value = "time")]
    #[serde(rename = "time")]
    TimeLimited,
    #[sea_orm(string_value = "special")]
    #[serde(rename = "special")]
    Special,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::Creator => "creator",
            AchievementType::Participant => "participant",
        }
    }
}

impl fmt::Display for AchievementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creator" => Ok(AchievementType::Creator),
            "participant" => Ok(AchievementType::Participant),
            other => Err(format!("unknown achievement type: {}", other)),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
