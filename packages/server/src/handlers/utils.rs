use axum::Json;

#[utoipa::path(
    get,
    path = "/health-check",
    tag = "Utils",
    operation_id = "healthCheck",
    summary = "Liveness probe",
    responses((status = 200, description = "Service is up", body = bool)),
)]
pub async fn health_check() -> Json<bool> {
    Json(true)
}
