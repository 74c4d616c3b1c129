// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use crate::auth::{AuthConfig, CurrentUser, OptionalAuth};
use crate::core::{ConfigManager, Database, InMemoryTagCache, NoopTagCache, TagCache};
use crate::job_infos::{JobInfo, JobInfoService, JobInfoSummary};
use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, patch, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[get("/job-infos")]
pub async fn list_job_infos(
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<DataResponse<Vec<JobInfoSummary>>>, ApiError> {
    handlers::list_job_infos_handler(auth, service).await
}

#[get("/job-infos/<id>")]
pub async fn get_job_info(
    id: String,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<DataResponse<JobInfo>>, ApiError> {
    handlers::get_job_info_handler(id, auth, service).await
}

#[post("/job-infos", data = "<request>")]
pub async fn create_job_info(
    request: Json<StandardRequest<RawFields>>,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::create_job_info_handler(request, auth, service).await
}

#[patch("/job-infos/<id>", data = "<request>")]
pub async fn update_job_info(
    id: String,
    request: Json<StandardRequest<RawFields>>,
    auth: OptionalAuth,
    service: &State<JobInfoService>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::update_job_info_handler(id, request, auth, service).await
}

#[get("/experience-levels")]
pub async fn experience_levels() -> Json<DataResponse<Vec<ExperienceLevelOption>>> {
    handlers::experience_levels_handler().await
}

#[get("/me")]
pub async fn get_current_user(
    auth: OptionalAuth,
) -> Result<Json<DataResponse<CurrentUser>>, ApiError> {
    handlers::get_current_user_handler(auth).await
}

#[get("/health")]
pub async fn health(
    auth: OptionalAuth,
    db: &State<Database>,
    cache: &State<Arc<dyn TagCache>>,
) -> Result<Json<DataResponse<HealthData>>, ApiError> {
    handlers::health_handler(auth, db, cache).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
        None,
    ))
}

// Body is valid JSON but not a JSON object
#[rocket::catch(422)]
pub fn unprocessable_entity() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid job data.".to_string(),
        "INVALID_DATA".to_string(),
        vec!["Submit the job info fields as a JSON object".to_string()],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

/// Everything the routes need, built once at startup
pub struct AppState {
    pub db: Database,
    pub auth_config: AuthConfig,
    pub cache: Arc<dyn TagCache>,
}

impl AppState {
    /// Connect storage, load signing keys and set up the read cache
    pub async fn from_config(config: &ConfigManager) -> Result<Self> {
        let db = Database::new(&config.app.database_path).await?;

        let mut auth_config = AuthConfig::from_settings(&config.app.auth);
        if let Some(keys_url) = &config.app.auth.keys_url {
            auth_config
                .update_signing_keys(keys_url)
                .await
                .context("Failed to fetch token signing keys")?;
        }

        let cache_settings = &config.app.cache;
        let cache: Arc<dyn TagCache> = if cache_settings.enabled {
            Arc::new(InMemoryTagCache::with_config(
                Duration::from_secs(cache_settings.ttl_seconds),
                cache_settings.max_entries,
            ))
        } else {
            Arc::new(NoopTagCache)
        };

        Ok(Self {
            db,
            auth_config,
            cache,
        })
    }
}

pub fn build_rocket(figment: Figment, state: AppState) -> Rocket<Build> {
    let service = JobInfoService::new(state.db.clone(), state.cache.clone());

    rocket::custom(figment)
        .attach(Cors)
        .manage(state.db)
        .manage(state.auth_config)
        .manage(state.cache)
        .manage(service)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable_entity, internal_error],
        )
        .mount(
            "/api",
            routes![
                list_job_infos,
                get_job_info,
                create_job_info,
                update_job_info,
                experience_levels,
                get_current_user,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: &ConfigManager) -> Result<()> {
    let state = AppState::from_config(config).await?;

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", config.app.port));

    info!("Starting Landr API server");
    info!("Environment: {}", config.environment);
    info!("Database: {}", config.app.database_path.display());
    info!(
        "Read cache: {}",
        if config.app.cache.enabled { "enabled" } else { "disabled" }
    );
    info!("Server: http://0.0.0.0:{}", config.app.port);

    build_rocket(figment, state)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
