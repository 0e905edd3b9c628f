use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};

use scribe_core::queue::{EnqueueOptions, JobQueue, QueueConfig, ReserveFilter};
use scribe_core::runtime::{Processor, ProcessorRegistry, Runtime};
use scribe_core::worker::{WorkerConfig, WorkerGroup};
use scribe_core::{EventKind, JobKind, JobPayload, JobRecord, ProcessorError, SiteId};
use ulid::Ulid;

/// Crawl processor that fails a few times before succeeding, to show the
/// retry/backoff path end to end.
struct FlakyCrawlProcessor {
    remaining_failures: AtomicU32,
}

impl FlakyCrawlProcessor {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Processor for FlakyCrawlProcessor {
    fn kind(&self) -> JobKind {
        JobKind::Crawl
    }

    async fn process(&self, job: &JobRecord) -> Result<(), ProcessorError> {
        let JobPayload::Crawl { start_url, .. } = &job.payload else {
            return Err(ProcessorError::new("unexpected payload variant"));
        };

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ProcessorError::new(format!(
                "intentional crawl failure (left={left})"
            )));
        }

        tracing::info!(%start_url, attempt = job.attempts, "crawl finished");
        Ok(())
    }
}

struct SerpProcessor;

#[async_trait]
impl Processor for SerpProcessor {
    fn kind(&self) -> JobKind {
        JobKind::Serp
    }

    async fn process(&self, job: &JobRecord) -> Result<(), ProcessorError> {
        let JobPayload::Serp { query } = &job.payload else {
            return Err(ProcessorError::new("unexpected payload variant"));
        };
        tracing::info!(%query, "serp results fetched");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // (A) Queue and processors.
    let queue = Arc::new(JobQueue::in_memory(QueueConfig::default()));

    let mut registry = ProcessorRegistry::new();
    registry
        .register(Arc::new(FlakyCrawlProcessor::new(2)))
        .expect("fresh registry");
    registry.register(Arc::new(SerpProcessor)).expect("fresh registry");
    let runtime = Arc::new(Runtime::new(Arc::new(registry)));

    // (B) Log the lifecycle as it happens.
    for kind in [
        EventKind::Enqueued,
        EventKind::Started,
        EventKind::Succeeded,
        EventKind::Failed,
    ] {
        queue.on(kind, move |event| {
            tracing::info!(
                job_id = %event.job().id,
                status = ?event.job().status,
                "event: {:?}",
                event.kind()
            );
        });
    }

    // (C) Workers.
    let group = WorkerGroup::spawn(
        2,
        Arc::clone(&queue),
        runtime,
        ReserveFilter::default(),
        WorkerConfig {
            poll_interval: Duration::from_millis(100),
            poll_jitter: Duration::from_millis(50),
        },
    );

    // (D) Enqueue work — the duplicate crawl is deduplicated.
    let site = SiteId::from_ulid(Ulid::new());
    let crawl = queue
        .enqueue(
            site,
            JobPayload::Crawl {
                start_url: "https://example.com".into(),
                max_pages: Some(50),
            },
            EnqueueOptions::default(),
        )
        .await
        .expect("enqueue crawl");
    let duplicate = queue
        .enqueue(
            site,
            JobPayload::Crawl {
                start_url: "https://example.com".into(),
                max_pages: Some(200),
            },
            EnqueueOptions::default(),
        )
        .await
        .expect("enqueue duplicate crawl");
    tracing::info!(
        job_id = %duplicate.job_id,
        disposition = ?duplicate.disposition,
        "second crawl request"
    );

    let serp = queue
        .enqueue(
            site,
            JobPayload::Serp {
                query: "best project management software".into(),
            },
            EnqueueOptions::default(),
        )
        .await
        .expect("enqueue serp");

    // (E) Poll until both jobs reach a terminal state.
    for job_id in [crawl.job_id, serp.job_id] {
        loop {
            let job = queue
                .get(job_id)
                .await
                .expect("store reachable")
                .expect("job exists");
            if job.status.is_terminal() {
                tracing::info!(
                    %job_id,
                    status = ?job.status,
                    attempts = job.attempts,
                    last_error = ?job.last_error,
                    "final status"
                );
                println!(
                    "{}",
                    serde_json::to_string_pretty(&job).expect("job snapshots serialize")
                );
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    tracing::info!(counts = ?queue.counts().await.expect("store reachable"), "queue counts");
    group.shutdown_and_join().await;
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
