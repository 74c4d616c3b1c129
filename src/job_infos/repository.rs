// src/job_infos/repository.rs
use anyhow::{Context, Result};
use chrono::TimeDelta;
use sqlx::{Connection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{JobInfo, JobInfoData};
use crate::utils::now_micros;

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, title, experience_level, description, created_at, updated_at FROM job_infos";

/// Job info rows; every lookup of a single record is scoped by its owner
pub struct JobInfoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobInfoRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, data: &JobInfoData) -> Result<JobInfo> {
        let now = now_micros();
        let job_info = JobInfo {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: data.name.clone(),
            title: data.title.clone(),
            experience_level: data.experience_level,
            description: data.description.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO job_infos
                (id, user_id, name, title, experience_level, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job_info.id)
        .bind(&job_info.user_id)
        .bind(&job_info.name)
        .bind(&job_info.title)
        .bind(job_info.experience_level)
        .bind(&job_info.description)
        .bind(job_info.created_at)
        .bind(job_info.updated_at)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to insert job info for user {}", user_id))?;

        info!("Created job info {} for user {}", job_info.id, user_id);
        Ok(job_info)
    }

    /// Apply `data` to the record if `user_id` owns it.
    ///
    /// Returns `None` when no such record exists for this owner; callers
    /// must not distinguish that from "owned by someone else".
    ///
    /// The write lock is taken before the ownership read, so overlapping
    /// updates queue on the busy timeout and the last one wins.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        data: &JobInfoData,
    ) -> Result<Option<JobInfo>> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to start job info update")?;

        let existing = sqlx::query_as::<_, JobInfo>(&format!(
            "{} WHERE id = ? AND user_id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            tx.rollback().await?;
            return Ok(None);
        };

        // updated_at must move strictly forward even within one clock tick
        let now = now_micros();
        let updated_at = if now > existing.updated_at {
            now
        } else {
            existing.updated_at + TimeDelta::microseconds(1)
        };

        sqlx::query(
            r#"
            UPDATE job_infos
            SET name = ?, title = ?, experience_level = ?, description = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&data.name)
        .bind(&data.title)
        .bind(data.experience_level)
        .bind(&data.description)
        .bind(updated_at)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to update job info {}", id))?;

        tx.commit().await?;

        info!("Updated job info {} for user {}", id, user_id);
        Ok(Some(JobInfo {
            name: data.name.clone(),
            title: data.title.clone(),
            experience_level: data.experience_level,
            description: data.description.clone(),
            updated_at,
            ..existing
        }))
    }

    pub async fn find_by_id(&self, id: &str, user_id: &str) -> Result<Option<JobInfo>> {
        let job_info = sqlx::query_as::<_, JobInfo>(&format!(
            "{} WHERE id = ? AND user_id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(job_info)
    }

    /// All of a user's job infos, most recently updated first
    pub async fn find_all_by_user(&self, user_id: &str) -> Result<Vec<JobInfo>> {
        let job_infos = sqlx::query_as::<_, JobInfo>(&format!(
            "{} WHERE user_id = ? ORDER BY updated_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(job_infos)
    }
}
