use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/login", login_routes())
        .nest("/users", user_routes())
        .nest("/patterns", pattern_routes(config))
        .nest("/utils", util_routes())
}

fn login_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login_access_token))
        .routes(routes!(handlers::auth::test_token))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::user::list_users,
            handlers::user::create_user
        ))
        .routes(routes!(handlers::user::register_user))
        .routes(routes!(
            handlers::user::read_user_me,
            handlers::user::update_user_me,
            handlers::user::delete_user_me
        ))
        .routes(routes!(handlers::user::update_password_me))
        .routes(routes!(
            handlers::user::read_user_by_id,
            handlers::user::update_user,
            handlers::user::delete_user
        ))
}

fn pattern_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::pattern::list_patterns,
            handlers::pattern::create_pattern
        ))
        .routes(routes!(
            handlers::pattern::get_pattern,
            handlers::pattern::update_pattern,
            handlers::pattern::delete_pattern
        ))
        .routes(routes!(handlers::files::download_file));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::files::upload_files))
        .layer(handlers::files::upload_body_limit(
            config.storage.max_file_size,
        ));

    crud.merge(upload)
}

fn util_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::utils::health_check))
}
