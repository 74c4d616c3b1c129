// src/web/handlers/job_info_handlers.rs

use crate::auth::OptionalAuth;
use crate::job_infos::{JobInfo, JobInfoService, JobInfoSummary};
use crate::web::types::{
    job_info_error, ActionResponse, ApiError, DataResponse, RawFields, StandardErrorResponse,
    StandardRequest, WithConversationId,
};

use rocket::serde::json::Json;
use rocket::State;
use serde_json::Value;
use tracing::info;

pub async fn list_job_infos_handler(
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<DataResponse<Vec<JobInfoSummary>>>, ApiError> {
    let job_infos = service
        .list_for_user(auth.user())
        .await
        .map_err(|e| job_info_error(e, None))?;

    let message = format!("Found {} job infos", job_infos.len());
    Ok(Json(DataResponse::success(message, job_infos, None)))
}

pub async fn get_job_info_handler(
    id: String,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<DataResponse<JobInfo>>, ApiError> {
    match service.get_for_user(auth.user(), &id).await {
        Ok(Some(job_info)) => Ok(Json(DataResponse::success(
            "Job info loaded".to_string(),
            job_info,
            None,
        ))),
        Ok(None) => Err(StandardErrorResponse::not_found(None)),
        Err(e) => Err(job_info_error(e, None)),
    }
}

pub async fn create_job_info_handler(
    request: Json<StandardRequest<RawFields>>,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conversation_id = request.conversation_id();
    let raw = Value::Object(request.into_inner().data);

    let outcome = service
        .submit_create(auth.user(), &raw)
        .await
        .map_err(|e| job_info_error(e, conversation_id.clone()))?;

    info!("Job info {} created", outcome.record_id);

    let response = ActionResponse::success(
        "Job info created successfully".to_string(),
        "created".to_string(),
        conversation_id,
    )
    .with_record(outcome.record_id, outcome.redirect_to);

    Ok(Json(response))
}

pub async fn update_job_info_handler(
    id: String,
    request: Json<StandardRequest<RawFields>>,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conversation_id = request.conversation_id();
    let raw = Value::Object(request.into_inner().data);

    let outcome = service
        .submit_update(auth.user(), &id, &raw)
        .await
        .map_err(|e| job_info_error(e, conversation_id.clone()))?;

    info!("Job info {} updated", outcome.record_id);

    let response = ActionResponse::success(
        "Job info updated successfully".to_string(),
        "updated".to_string(),
        conversation_id,
    )
    .with_record(outcome.record_id, outcome.redirect_to);

    Ok(Json(response))
}
