// src/job_infos/service.rs
//! Job info operations exposed to the web layer: identity gate, validation,
//! ownership-scoped persistence and cache revalidation.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::cache_tags::{self, list_key, list_tags, record_key, record_tags};
use super::{validate_job_info, JobInfo, JobInfoError, JobInfoRepository, JobInfoSummary};
use crate::auth::CurrentUser;
use crate::core::cache::{cached, TagCache};
use crate::core::Database;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub record_id: String,
    /// Detail page the UI should navigate to
    pub redirect_to: String,
}

impl SubmitOutcome {
    fn for_record(id: &str) -> Self {
        Self {
            record_id: id.to_string(),
            redirect_to: format!("/jobinfos/{}", id),
        }
    }
}

/// Precondition for every job info operation
pub fn require_user(user: Option<&CurrentUser>) -> Result<&CurrentUser, JobInfoError> {
    user.ok_or_else(|| {
        warn!("Rejected job info request without identity");
        JobInfoError::NoPermission
    })
}

fn storage_fault(context: &str, err: anyhow::Error) -> JobInfoError {
    error!("{}: {:#}", context, err);
    JobInfoError::Storage(err)
}

#[derive(Clone)]
pub struct JobInfoService {
    db: Database,
    cache: Arc<dyn TagCache>,
}

impl JobInfoService {
    pub fn new(db: Database, cache: Arc<dyn TagCache>) -> Self {
        Self { db, cache }
    }

    fn validate(&self, user: &CurrentUser, raw: &Value) -> Result<super::JobInfoData, JobInfoError> {
        validate_job_info(raw).map_err(|errors| {
            info!("Rejected job info from {}: {}", user.id, errors);
            JobInfoError::InvalidData(errors)
        })
    }

    pub async fn submit_create(
        &self,
        user: Option<&CurrentUser>,
        raw: &Value,
    ) -> Result<SubmitOutcome, JobInfoError> {
        let user = require_user(user)?;
        let data = self.validate(user, raw)?;

        let repo = JobInfoRepository::new(self.db.pool());
        let job_info = repo
            .create(&user.id, &data)
            .await
            .map_err(|e| storage_fault("Failed to create job info", e))?;

        cache_tags::revalidate(self.cache.as_ref(), &job_info.id, &user.id);
        Ok(SubmitOutcome::for_record(&job_info.id))
    }

    pub async fn submit_update(
        &self,
        user: Option<&CurrentUser>,
        id: &str,
        raw: &Value,
    ) -> Result<SubmitOutcome, JobInfoError> {
        let user = require_user(user)?;
        let data = self.validate(user, raw)?;

        let repo = JobInfoRepository::new(self.db.pool());
        let job_info = repo
            .update(id, &user.id, &data)
            .await
            .map_err(|e| storage_fault("Failed to update job info", e))?
            .ok_or_else(|| {
                warn!("User {} cannot update job info {}", user.id, id);
                JobInfoError::NoPermission
            })?;

        cache_tags::revalidate(self.cache.as_ref(), &job_info.id, &user.id);
        Ok(SubmitOutcome::for_record(&job_info.id))
    }

    pub async fn list_for_user(
        &self,
        user: Option<&CurrentUser>,
    ) -> Result<Vec<JobInfoSummary>, JobInfoError> {
        let user = require_user(user)?;
        let repo = JobInfoRepository::new(self.db.pool());

        let job_infos: Vec<JobInfo> = cached(
            self.cache.as_ref(),
            list_key(&user.id),
            list_tags(&user.id),
            || repo.find_all_by_user(&user.id),
        )
        .await
        .map_err(|e| storage_fault("Failed to list job infos", e))?;

        Ok(job_infos.into_iter().map(JobInfoSummary::from).collect())
    }

    pub async fn get_for_user(
        &self,
        user: Option<&CurrentUser>,
        id: &str,
    ) -> Result<Option<JobInfo>, JobInfoError> {
        let user = require_user(user)?;
        let repo = JobInfoRepository::new(self.db.pool());

        cached(
            self.cache.as_ref(),
            record_key(id, &user.id),
            record_tags(id, &user.id),
            || repo.find_by_id(id, &user.id),
        )
        .await
        .map_err(|e| storage_fault("Failed to load job info", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{InMemoryTagCache, NoopTagCache};
    use crate::core::database::UserRepository;
    use crate::job_infos::{ExperienceLevel, JobInfoData};
    use serde_json::json;

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            name: None,
            image_url: None,
        }
    }

    async fn setup(cache: Arc<dyn TagCache>) -> (Database, JobInfoService) {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users.upsert("u1", None, None, None).await.unwrap();
        users.upsert("u2", None, None, None).await.unwrap();
        let service = JobInfoService::new(db.clone(), cache);
        (db, service)
    }

    fn backend() -> Value {
        json!({
            "name": "Backend",
            "title": null,
            "experience_level": "junior",
            "description": "Build APIs",
        })
    }

    #[tokio::test]
    async fn test_create_then_get_returns_submitted_fields() {
        let (_db, service) = setup(Arc::new(InMemoryTagCache::new())).await;
        let u1 = user("u1");

        let outcome = service.submit_create(Some(&u1), &backend()).await.unwrap();
        assert_eq!(outcome.redirect_to, format!("/jobinfos/{}", outcome.record_id));

        let job_info = service
            .get_for_user(Some(&u1), &outcome.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job_info.user_id, "u1");
        assert_eq!(
            job_info.data(),
            JobInfoData {
                name: "Backend".to_string(),
                title: None,
                experience_level: ExperienceLevel::Junior,
                description: "Build APIs".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_submission_writes_nothing() {
        let (_db, service) = setup(Arc::new(InMemoryTagCache::new())).await;
        let u1 = user("u1");

        let mut input = backend();
        input["experience_level"] = json!("expert");

        let err = service.submit_create(Some(&u1), &input).await.unwrap_err();
        assert!(matches!(err, JobInfoError::InvalidData(_)));
        assert_eq!(err.message(), "Invalid job data.");
        assert!(service.list_for_user(Some(&u1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_rejected_everywhere() {
        let (_db, service) = setup(Arc::new(InMemoryTagCache::new())).await;

        let create = service.submit_create(None, &backend()).await.unwrap_err();
        let update = service.submit_update(None, "x", &backend()).await.unwrap_err();
        let list = service.list_for_user(None).await.unwrap_err();
        let get = service.get_for_user(None, "x").await.unwrap_err();

        for err in [create, update, list, get] {
            assert!(matches!(err, JobInfoError::NoPermission));
            assert_eq!(err.message(), "You don't have permission to do this.");
        }
    }

    #[tokio::test]
    async fn test_update_of_foreign_or_missing_record_is_uniform() {
        let (_db, service) = setup(Arc::new(InMemoryTagCache::new())).await;
        let (u1, u2) = (user("u1"), user("u2"));

        let outcome = service.submit_create(Some(&u1), &backend()).await.unwrap();
        let before = service
            .get_for_user(Some(&u1), &outcome.record_id)
            .await
            .unwrap();

        let mut change = backend();
        change["name"] = json!("Stolen");
        let foreign = service
            .submit_update(Some(&u2), &outcome.record_id, &change)
            .await
            .unwrap_err();
        let missing = service
            .submit_update(Some(&u2), "does-not-exist", &change)
            .await
            .unwrap_err();

        assert_eq!(foreign.message(), missing.message());
        assert!(matches!(foreign, JobInfoError::NoPermission));

        let after = service
            .get_for_user(Some(&u1), &outcome.record_id)
            .await
            .unwrap();
        assert_eq!(before, after);
        assert!(service
            .get_for_user(Some(&u2), &outcome.record_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_writes_invalidate_cached_reads() {
        let (db, service) = setup(Arc::new(InMemoryTagCache::new())).await;
        let u1 = user("u1");

        let outcome = service.submit_create(Some(&u1), &backend()).await.unwrap();
        let id = outcome.record_id;

        // Warm both caches.
        assert_eq!(service.list_for_user(Some(&u1)).await.unwrap().len(), 1);
        service.get_for_user(Some(&u1), &id).await.unwrap().unwrap();

        // A write that bypasses the service is invisible: reads are cached.
        let repo = JobInfoRepository::new(db.pool());
        let mut hidden = validate_job_info(&backend()).unwrap();
        hidden.name = "Written behind the cache".to_string();
        repo.create("u1", &hidden).await.unwrap();
        assert_eq!(service.list_for_user(Some(&u1)).await.unwrap().len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let mut change = backend();
        change["name"] = json!("Backend (renamed)");
        change["title"] = json!("API Engineer");
        service.submit_update(Some(&u1), &id, &change).await.unwrap();

        let list = service.list_for_user(Some(&u1)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, id);
        assert_eq!(list[0].name, "Backend (renamed)");

        let record = service.get_for_user(Some(&u1), &id).await.unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("API Engineer"));
    }

    #[tokio::test]
    async fn test_service_without_cache() {
        let (_db, service) = setup(Arc::new(NoopTagCache)).await;
        let u1 = user("u1");

        service.submit_create(Some(&u1), &backend()).await.unwrap();
        service.submit_create(Some(&u1), &backend()).await.unwrap();
        assert_eq!(service.list_for_user(Some(&u1)).await.unwrap().len(), 2);
        assert!(service.list_for_user(Some(&user("u2"))).await.unwrap().is_empty());
    }
}
