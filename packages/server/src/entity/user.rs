use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub email: String,
    pub full_name: Option<String>,

    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub hashed_password: String,

    pub is_active: bool,
    pub is_superuser: bool,

    #[sea_orm(has_many)]
    pub patterns: HasMany<super::pattern::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
