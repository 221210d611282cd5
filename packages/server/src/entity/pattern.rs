use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pattern")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,
    pub description: Option<String>,
    /// One of: Fibre Mood, Other, Seamwork
    pub brand: String,
    /// One of: Paper, Digital
    pub version: String,
    pub pattern_url: Option<String>,
    /// One of: Baby, Kids, Men, Women, Pets
    pub for_who: String,
    pub category: Option<String>,
    pub difficulty: i32, // 1-5
    pub fabric: Option<String>,
    pub fabric_amount: Option<f64>,

    pub owner_id: Uuid,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    // Attachment slots: object keys, NULL when empty.
    pub pattern_a0_file_id: Option<String>,
    pub pattern_a0_sa_file_id: Option<String>,
    pub pattern_a0_sa_projector_file_id: Option<String>,
    pub pattern_a0_projector_file_id: Option<String>,
    pub pattern_a4_file_id: Option<String>,
    pub pattern_a4_sa_file_id: Option<String>,
    pub pattern_instructables_file_id: Option<String>,
    pub icon: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
