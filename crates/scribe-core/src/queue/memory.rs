//! In-memory job store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{JobId, JobRecord, JobStatus};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{JobFilter, JobStore, StatusPatch};

/// Store backed by a single map under a mutex.
///
/// Design:
/// - The records map is the single source of truth; there are no side
///   queues to drift out of sync with it.
/// - `claim` does its compare-and-set while holding the lock, which makes it
///   linearizable across every task sharing this store.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: JobRecord) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.id) {
            return Err(QueueError::Validation(format!(
                "job id {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, QueueError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.get(&id).cloned())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, QueueError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.values().filter(|j| filter.matches(j)).cloned().collect())
    }

    async fn claim(&self, id: JobId, now: DateTime<Utc>) -> Result<Option<JobRecord>, QueueError> {
        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != JobStatus::Queued {
            return Ok(None);
        }
        record.begin_attempt(now);
        Ok(Some(record.clone()))
    }

    async fn update(
        &self,
        id: JobId,
        patch: StatusPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, QueueError> {
        let mut jobs = self.jobs.lock().await;
        let Some(record) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if record.status != JobStatus::Running {
            return Ok(None);
        }
        match patch {
            StatusPatch::Succeed => record.mark_succeeded(now),
            StatusPatch::FailTerminal { error } => record.mark_failed(error, now),
            StatusPatch::RequeueRetry { run_at, error } => {
                record.requeue_for_retry(run_at, error, now)
            }
            StatusPatch::Release { run_at, priority } => {
                record.requeue_released(run_at, priority, now)
            }
        }
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: JobId) -> Result<bool, QueueError> {
        let mut jobs = self.jobs.lock().await;
        Ok(jobs.remove(&id).is_some())
    }

    async fn find_active(&self, fingerprint: &str) -> Result<Option<JobRecord>, QueueError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .find(|j| !j.status.is_terminal() && j.fingerprint() == fingerprint)
            .cloned())
    }

    async fn counts_by_status(&self) -> Result<QueueCounts, QueueError> {
        let jobs = self.jobs.lock().await;
        let mut counts = QueueCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Succeeded => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobPayload, SiteId};
    use std::sync::Arc;
    use ulid::Ulid;

    fn record(site: SiteId, url: &str) -> JobRecord {
        let now = Utc::now();
        JobRecord::new(
            JobId::from_ulid(Ulid::new()),
            site,
            JobPayload::Crawl {
                start_url: url.into(),
                max_pages: None,
            },
            0,
            now,
            3,
            now,
        )
    }

    #[tokio::test]
    async fn insert_get_delete_round_trip() {
        let store = InMemoryJobStore::new();
        let job = record(SiteId::from_ulid(Ulid::new()), "https://a.example");
        let id = job.id;

        store.insert(job).await.unwrap();
        assert!(store.get(id).await.unwrap().is_some());

        assert!(store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryJobStore::new();
        let job = record(SiteId::from_ulid(Ulid::new()), "https://a.example");

        store.insert(job.clone()).await.unwrap();
        assert!(store.insert(job).await.is_err());
    }

    #[tokio::test]
    async fn claim_is_a_compare_and_set() {
        let store = InMemoryJobStore::new();
        let job = record(SiteId::from_ulid(Ulid::new()), "https://a.example");
        let id = job.id;
        store.insert(job).await.unwrap();

        let claimed = store.claim(id, Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.started_at.is_some());

        // Second claim loses: the job is no longer queued.
        assert!(store.claim(id, Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_claims_grant_exactly_one_winner() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = record(SiteId::from_ulid(Ulid::new()), "https://a.example");
        let id = job.id;
        store.insert(job).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(
                async move { store.claim(id, Utc::now()).await },
            ));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn update_requires_running_status() {
        let store = InMemoryJobStore::new();
        let job = record(SiteId::from_ulid(Ulid::new()), "https://a.example");
        let id = job.id;
        store.insert(job).await.unwrap();

        // Still queued: the precondition fails.
        let result = store.update(id, StatusPatch::Succeed, Utc::now()).await.unwrap();
        assert!(result.is_none());

        store.claim(id, Utc::now()).await.unwrap().unwrap();
        let updated = store
            .update(id, StatusPatch::Succeed, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Succeeded);
        assert!(updated.finished_at.is_some());
    }

    #[tokio::test]
    async fn list_applies_filters() {
        let store = InMemoryJobStore::new();
        let site_a = SiteId::from_ulid(Ulid::new());
        let site_b = SiteId::from_ulid(Ulid::new());
        store.insert(record(site_a, "https://a.example")).await.unwrap();
        store.insert(record(site_a, "https://a.example/blog")).await.unwrap();
        store.insert(record(site_b, "https://b.example")).await.unwrap();

        let all = store.list(&JobFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let filter = JobFilter {
            site_id: Some(site_a),
            ..JobFilter::default()
        };
        assert_eq!(store.list(&filter).await.unwrap().len(), 2);

        let filter = JobFilter {
            statuses: Some(vec![JobStatus::Running]),
            ..JobFilter::default()
        };
        assert!(store.list(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_active_ignores_terminal_jobs() {
        let store = InMemoryJobStore::new();
        let site = SiteId::from_ulid(Ulid::new());
        let job = record(site, "https://a.example");
        let id = job.id;
        let fingerprint = job.fingerprint();
        store.insert(job).await.unwrap();

        assert!(store.find_active(&fingerprint).await.unwrap().is_some());

        store.claim(id, Utc::now()).await.unwrap().unwrap();
        // Running still counts as active.
        assert!(store.find_active(&fingerprint).await.unwrap().is_some());

        store
            .update(id, StatusPatch::Succeed, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(store.find_active(&fingerprint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_track_statuses() {
        let store = InMemoryJobStore::new();
        let site = SiteId::from_ulid(Ulid::new());
        let a = record(site, "https://a.example");
        let b = record(site, "https://b.example");
        let id_a = a.id;
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();
        store.claim(id_a, Utc::now()).await.unwrap().unwrap();

        let counts = store.counts_by_status().await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 1);
        assert_eq!(counts.succeeded, 0);
        assert_eq!(counts.failed, 0);
    }
}
