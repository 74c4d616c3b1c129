// src/web/handlers/system_handlers.rs
use crate::auth::{CurrentUser, OptionalAuth};
use crate::core::{Database, TagCache};
use crate::job_infos::service::require_user;
use crate::job_infos::ExperienceLevel;
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;
use tracing::{error, info};

pub async fn get_current_user_handler(
    auth: OptionalAuth,
) -> Result<Json<DataResponse<CurrentUser>>, ApiError> {
    let user = require_user(auth.user()).map_err(|e| job_info_error(e, None))?;

    Ok(Json(DataResponse::success(
        "User authenticated successfully".to_string(),
        user.clone(),
        None,
    )))
}

pub async fn experience_levels_handler() -> Json<DataResponse<Vec<ExperienceLevelOption>>> {
    let options = ExperienceLevel::ALL
        .iter()
        .map(|level| ExperienceLevelOption {
            value: level.as_str(),
            label: level.label(),
        })
        .collect();

    Json(DataResponse::success(
        "Available experience levels".to_string(),
        options,
        None,
    ))
}

pub async fn health_handler(
    auth: OptionalAuth,
    db: &State<Database>,
    cache: &State<Arc<dyn TagCache>>,
) -> Result<Json<DataResponse<HealthData>>, ApiError> {
    match auth.user() {
        Some(user) => info!("Health check by authenticated user: {}", user.id),
        None => info!("Health check by anonymous user"),
    }

    if let Err(e) = db.health_check().await {
        error!("Health check failed: {:#}", e);
        return Err((
            Status::ServiceUnavailable,
            Json(StandardErrorResponse::new(
                "Database unavailable".to_string(),
                "DATABASE_ERROR".to_string(),
                vec!["Try again in a few moments".to_string()],
                None,
            )),
        ));
    }

    Ok(Json(DataResponse::success(
        "OK".to_string(),
        HealthData {
            database: "ok",
            cache: cache.stats(),
        },
        None,
    )))
}
