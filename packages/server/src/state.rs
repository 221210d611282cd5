use std::sync::Arc;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::attachments::AttachmentCoordinator;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ObjectStore>,
    pub attachments: AttachmentCoordinator,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            attachments: AttachmentCoordinator::new(store.clone()),
            store,
        }
    }
}
