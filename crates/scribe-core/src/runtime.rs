use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{JobKind, JobRecord};
use crate::error::{ProcessorError, QueueError};

/// A processor for one job kind.
///
/// Takes the whole `JobRecord` so the processor can match out the payload
/// variant it registered for.
#[async_trait]
pub trait Processor: Send + Sync {
    fn kind(&self) -> JobKind;

    async fn process(&self, job: &JobRecord) -> Result<(), ProcessorError>;
}

/// Registry of processors (kind -> processor).
///
/// Design:
/// - Built during initialization (mutable).
/// - Used during runtime (immutable).
/// This avoids locks and keeps dispatch a plain map lookup.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<JobKind, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor under its declared kind.
    pub fn register(&mut self, processor: Arc<dyn Processor>) -> Result<(), QueueError> {
        let kind = processor.kind();
        if self.processors.contains_key(&kind) {
            return Err(QueueError::DuplicateProcessor(kind));
        }
        self.processors.insert(kind, processor);
        Ok(())
    }

    pub fn get(&self, kind: JobKind) -> Option<&Arc<dyn Processor>> {
        self.processors.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Runtime executes a claimed job by dispatching on its kind.
pub struct Runtime {
    registry: Arc<ProcessorRegistry>,
}

impl Runtime {
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Execute one job.
    pub async fn execute(&self, job: &JobRecord) -> Result<(), QueueError> {
        let processor = self
            .registry
            .get(job.kind)
            .ok_or(QueueError::ProcessorNotFound(job.kind))?;

        processor.process(job).await.map_err(QueueError::from)
    }
}
