// src/models/mine.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Mine {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Obuasi North Pit")]
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    #[schema(example = "alluvial")]
    pub mine_type: String,
    #[schema(example = "Obuasi, Ashanti")]
    pub location: String,
    #[schema(example = "MC-2024-0193")]
    pub license_number: String,
    pub owner_user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMinePayload {
    #[validate(length(min = 1, max = 255, message = "Name is required."))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 255, message = "Type is required."))]
    pub mine_type: String,

    #[validate(length(min = 1, max = 255, message = "Location is required."))]
    pub location: String,

    #[validate(length(min = 1, max = 255, message = "License number is required."))]
    pub license_number: String,
}

impl CreateMinePayload {
    // Validação roda depois do trim, senão "   " passaria
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            mine_type: self.mine_type.trim().to_owned(),
            location: self.location.trim().to_owned(),
            license_number: self.license_number.trim().to_owned(),
        }
    }
}

/// Linha a inserir, com o dono já resolvido.
#[derive(Debug, Clone)]
pub struct NewMine {
    pub name: String,
    pub mine_type: String,
    pub location: String,
    pub license_number: String,
    pub owner_user_id: i32,
}
