use sea_orm::*;
use tracing::info;
use uuid::Uuid;

use crate::config::SuperuserConfig;
use crate::entity::user;
use crate::utils::hash;

/// Create the configured superuser if no account with that email exists.
pub async fn ensure_superuser(
    db: &DatabaseConnection,
    config: &SuperuserConfig,
) -> anyhow::Result<()> {
    let hashed = hash::hash_password(&config.password)
        .map_err(|e| anyhow::anyhow!("failed to hash superuser password: {e}"))?;

    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(config.email.clone()),
        full_name: Set(None),
        hashed_password: Set(hashed),
        is_active: Set(true),
        is_superuser: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {}
        Ok(_) => info!(email = %config.email, "Seeded superuser"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
