// src/web/types.rs

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::cache::CacheStats;
use crate::job_infos::{FieldError, JobInfoError};

/// Error half of every fallible route
pub type ApiError = (Status, Json<StandardErrorResponse>);

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Action,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

// Request wrapper: the submitted fields plus an optional conversation_id
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Raw, unvalidated form fields
pub type RawFields = Map<String, Value>;

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ExperienceLevelOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            record_id: None,
            redirect_to: None,
            conversation_id,
        }
    }

    pub fn with_record(mut self, record_id: String, redirect_to: String) -> Self {
        self.record_id = Some(record_id);
        self.redirect_to = Some(redirect_to);
        self
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            field_errors: None,
            conversation_id,
        }
    }

    pub fn with_field_errors(mut self, field_errors: Vec<FieldError>) -> Self {
        self.field_errors = Some(field_errors);
        self
    }

    pub fn not_found(conversation_id: Option<String>) -> ApiError {
        (
            Status::NotFound,
            Json(Self::new(
                "Job info not found".to_string(),
                "NOT_FOUND".to_string(),
                vec!["Check the job info id".to_string()],
                conversation_id,
            )),
        )
    }
}

/// Map a job info failure onto status code and error body
pub fn job_info_error(err: JobInfoError, conversation_id: Option<String>) -> ApiError {
    let (status, suggestions) = match &err {
        JobInfoError::NoPermission => (
            Status::Forbidden,
            vec!["Sign in with the account that owns this job info".to_string()],
        ),
        JobInfoError::InvalidData(_) => (
            Status::UnprocessableEntity,
            vec!["Check the highlighted fields and submit again".to_string()],
        ),
        JobInfoError::Storage(_) => (
            Status::InternalServerError,
            vec![
                "Try again in a few moments".to_string(),
                "Contact support if the problem persists".to_string(),
            ],
        ),
    };

    let mut body = StandardErrorResponse::new(
        err.message().to_string(),
        err.error_code().to_string(),
        suggestions,
        conversation_id,
    );
    if let JobInfoError::InvalidData(errors) = err {
        body = body.with_field_errors(errors.errors);
    }

    (status, Json(body))
}
