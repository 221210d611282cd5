use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::{double_option, validate_max_len, validate_optional_max_len};
use crate::entity::pattern;
use crate::error::AppError;

/// Closed set of display strings stored as text in the database.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }
    };
}

string_enum!(
    /// Pattern publisher.
    Brand {
        FibreMood => "Fibre Mood",
        Other => "Other",
        Seamwork => "Seamwork",
    }
);

string_enum!(
    /// Physical or digital pattern.
    Version {
        Paper => "Paper",
        Digital => "Digital",
    }
);

string_enum!(
    /// Who the garment is made for.
    ForWho {
        Baby => "Baby",
        Kids => "Kids",
        Men => "Men",
        Women => "Women",
        Pets => "Pets",
    }
);

string_enum!(
    Category {
        Accessories => "Accessories",
        Bags => "Bags",
        Blazers => "Blazers",
        Bodywarmer => "Bodywarmer",
        Cardigans => "Cardigans",
        Coats => "Coats",
        Diy => "DIY",
        Dresses => "Dresses",
        Hoodie => "Hoodie",
        Jackets => "Jackets",
        Jumpers => "Jumpers",
        Jumpsuits => "Jumpsuits",
        Overalls => "Overalls",
        Overshirt => "Overshirt",
        Pullovers => "Pullovers",
        Shirts => "Shirts",
        Shorts => "Shorts",
        Skirts => "Skirts",
        Sweaters => "Sweaters",
        Swimwear => "Swimwear",
        TShirts => "T-shirts",
        Tops => "Tops",
        Trousers => "Trousers",
    }
);

/// Request body for creating a pattern. Attachments are added via upload.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePatternRequest {
    /// 1-255 characters.
    #[schema(example = "Wrap dress")]
    pub title: String,
    pub description: Option<String>,
    pub brand: Brand,
    pub version: Version,
    #[schema(example = "https://example.com/patterns/wrap-dress")]
    pub pattern_url: Option<String>,
    pub for_who: ForWho,
    pub category: Option<Category>,
    /// 1 (easiest) to 5.
    #[schema(example = 3)]
    pub difficulty: i32,
    #[schema(example = "Viscose")]
    pub fabric: Option<String>,
    /// Metres of fabric, never negative.
    #[schema(example = 2.5)]
    pub fabric_amount: Option<f64>,
}

pub fn validate_create_pattern(payload: &CreatePatternRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_optional_max_len("Description", payload.description.as_deref(), 255)?;
    validate_optional_max_len("Pattern URL", payload.pattern_url.as_deref(), 255)?;
    validate_optional_max_len("Fabric", payload.fabric.as_deref(), 255)?;
    validate_difficulty(payload.difficulty)?;
    validate_fabric_amount(payload.fabric_amount)
}

/// Partial update. Absent fields are left unchanged; nullable fields may be
/// cleared with an explicit `null`.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdatePatternRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub brand: Option<Brand>,
    pub version: Option<Version>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub pattern_url: Option<Option<String>>,
    pub for_who: Option<ForWho>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Category>)]
    pub category: Option<Option<Category>>,
    pub difficulty: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub fabric: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub fabric_amount: Option<Option<f64>>,
}

pub fn validate_update_pattern(payload: &UpdatePatternRequest) -> Result<(), AppError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(Some(description)) = &payload.description {
        validate_max_len("Description", description, 255)?;
    }
    if let Some(Some(url)) = &payload.pattern_url {
        validate_max_len("Pattern URL", url, 255)?;
    }
    if let Some(Some(fabric)) = &payload.fabric {
        validate_max_len("Fabric", fabric, 255)?;
    }
    if let Some(difficulty) = payload.difficulty {
        validate_difficulty(difficulty)?;
    }
    if let Some(amount) = payload.fabric_amount {
        validate_fabric_amount(amount)?;
    }
    Ok(())
}

/// List filters. Every provided filter must match exactly.
#[derive(Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatternListQuery {
    pub title: Option<String>,
    pub brand: Option<Brand>,
    pub version: Option<Version>,
    pub for_who: Option<ForWho>,
    pub category: Option<Category>,
    pub difficulty: Option<i32>,
    pub fabric: Option<String>,
    pub fabric_amount: Option<f64>,
    /// Number of patterns to skip. Default: 0.
    pub skip: Option<u64>,
    /// Page size (1-1000). Default: 100.
    pub limit: Option<u64>,
    /// Only return the caller's own patterns.
    #[serde(default)]
    pub self_patterns: bool,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatternResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "Fibre Mood")]
    pub brand: String,
    #[schema(example = "Digital")]
    pub version: String,
    pub pattern_url: Option<String>,
    #[schema(example = "Women")]
    pub for_who: String,
    pub category: Option<String>,
    pub difficulty: i32,
    pub fabric: Option<String>,
    pub fabric_amount: Option<f64>,
    pub owner_id: Uuid,
    pub pattern_a0_file_id: Option<String>,
    pub pattern_a0_sa_file_id: Option<String>,
    pub pattern_a0_sa_projector_file_id: Option<String>,
    pub pattern_a0_projector_file_id: Option<String>,
    pub pattern_a4_file_id: Option<String>,
    pub pattern_a4_sa_file_id: Option<String>,
    pub pattern_instructables_file_id: Option<String>,
    #[schema(example = "4f1c0e8a9b7d4c2e8f3a6b5d1e0c9a7b.svg")]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<pattern::Model> for PatternResponse {
    fn from(m: pattern::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            brand: m.brand,
            version: m.version,
            pattern_url: m.pattern_url,
            for_who: m.for_who,
            category: m.category,
            difficulty: m.difficulty,
            fabric: m.fabric,
            fabric_amount: m.fabric_amount,
            owner_id: m.owner_id,
            pattern_a0_file_id: m.pattern_a0_file_id,
            pattern_a0_sa_file_id: m.pattern_a0_sa_file_id,
            pattern_a0_sa_projector_file_id: m.pattern_a0_sa_projector_file_id,
            pattern_a0_projector_file_id: m.pattern_a0_projector_file_id,
            pattern_a4_file_id: m.pattern_a4_file_id,
            pattern_a4_sa_file_id: m.pattern_a4_sa_file_id,
            pattern_instructables_file_id: m.pattern_instructables_file_id,
            icon: m.icon,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatternListResponse {
    pub data: Vec<PatternResponse>,
    /// Number of matching patterns, ignoring `skip` and `limit`.
    pub count: u64,
}

/// Multipart body of the upload endpoint, for the API docs only.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Pattern ID.
    pub id: Uuid,
    #[schema(format = Binary)]
    pub pattern_a0_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_a0_sa_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_a0_sa_projector_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_a0_projector_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_a4_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_a4_sa_file: Option<String>,
    #[schema(format = Binary)]
    pub pattern_instructables_file: Option<String>,
    #[schema(format = Binary)]
    pub icon: Option<String>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(AppError::Validation(
            "Title must be 1-255 characters".into(),
        ));
    }
    Ok(())
}

fn validate_difficulty(difficulty: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&difficulty) {
        return Err(AppError::Validation(
            "Difficulty must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

fn validate_fabric_amount(amount: Option<f64>) -> Result<(), AppError> {
    if let Some(amount) = amount
        && !(amount.is_finite() && amount >= 0.0)
    {
        return Err(AppError::Validation(
            "Fabric amount must be a non-negative number".into(),
        ));
    }
    Ok(())
}
