// src/job_infos/cache_tags.rs
//! Cache tags and keys for job info reads

use tracing::debug;

use crate::core::cache::TagCache;

const JOB_INFOS: &str = "jobInfos";

/// All job info reads for one user
pub fn user_tag(user_id: &str) -> String {
    format!("user:{}:{}", user_id, JOB_INFOS)
}

/// Reads of one job info record
pub fn record_tag(id: &str) -> String {
    format!("id:{}:{}", id, JOB_INFOS)
}

pub fn revalidation_tags(id: &str, user_id: &str) -> Vec<String> {
    vec![user_tag(user_id), record_tag(id)]
}

pub fn list_key(user_id: &str) -> String {
    format!("{}:list:{}", JOB_INFOS, user_id)
}

pub fn list_tags(user_id: &str) -> Vec<String> {
    vec![user_tag(user_id)]
}

pub fn record_key(id: &str, user_id: &str) -> String {
    format!("{}:record:{}:{}", JOB_INFOS, id, user_id)
}

pub fn record_tags(id: &str, user_id: &str) -> Vec<String> {
    vec![record_tag(id), user_tag(user_id)]
}

/// Invalidate everything a write to `id` owned by `user_id` can make stale
pub fn revalidate(cache: &dyn TagCache, id: &str, user_id: &str) {
    for tag in revalidation_tags(id, user_id) {
        cache.invalidate_tag(&tag);
    }
    debug!("Revalidated job info cache for {} (user {})", id, user_id);
}
