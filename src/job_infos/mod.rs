// src/job_infos/mod.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod cache_tags;
pub mod error;
pub mod repository;
pub mod schema;
pub mod service;

pub use error::JobInfoError;
pub use repository::JobInfoRepository;
pub use schema::{validate_job_info, FieldError, ValidationErrors};
pub use service::{JobInfoService, SubmitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    Junior,
    MidLevel,
    Senior,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::Junior,
        ExperienceLevel::MidLevel,
        ExperienceLevel::Senior,
    ];

    /// Wire and storage value
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::MidLevel => "mid-level",
            ExperienceLevel::Senior => "senior",
        }
    }

    /// Human readable label for forms
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "Junior",
            ExperienceLevel::MidLevel => "Mid-Level",
            ExperienceLevel::Senior => "Senior",
        }
    }

    /// Exact, case-sensitive match against the wire values
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

/// Validated job info fields, as accepted from a form submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfoData {
    pub name: String,
    pub title: Option<String>,
    pub experience_level: ExperienceLevel,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobInfo {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub title: Option<String>,
    pub experience_level: ExperienceLevel,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobInfo {
    pub fn data(&self) -> JobInfoData {
        JobInfoData {
            name: self.name.clone(),
            title: self.title.clone(),
            experience_level: self.experience_level,
            description: self.description.clone(),
        }
    }
}

/// List entry shown on the user's job info overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfoSummary {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub experience_level: ExperienceLevel,
    pub updated_at: DateTime<Utc>,
}

impl From<JobInfo> for JobInfoSummary {
    fn from(job_info: JobInfo) -> Self {
        Self {
            id: job_info.id,
            name: job_info.name,
            title: job_info.title,
            experience_level: job_info.experience_level,
            updated_at: job_info.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_level_parse_is_case_sensitive() {
        assert_eq!(ExperienceLevel::parse("junior"), Some(ExperienceLevel::Junior));
        assert_eq!(
            ExperienceLevel::parse("mid-level"),
            Some(ExperienceLevel::MidLevel)
        );
        assert_eq!(ExperienceLevel::parse("Senior"), None);
        assert_eq!(ExperienceLevel::parse("expert"), None);
    }

    #[test]
    fn test_experience_level_serde_matches_wire_values() {
        for level in ExperienceLevel::ALL {
            let json = serde_json::to_value(level).unwrap();
            assert_eq!(json, serde_json::Value::String(level.as_str().to_string()));
        }
        assert_eq!(ExperienceLevel::MidLevel.label(), "Mid-Level");
    }
}
