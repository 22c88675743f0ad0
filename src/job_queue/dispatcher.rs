//! Polling dispatcher for the durable job queue.
//!
//! One dispatcher task wakes on a fixed interval, claims the oldest PENDING
//! job and routes it to its registered handler. Cycles never overlap: the
//! next tick is only armed after the previous cycle returned.

use super::handlers::JobHandler;
use super::models::Job;
use super::store::JobStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct JobDispatcher {
    store: Arc<dyn JobStore>,
    handlers: HashMap<&'static str, Box<dyn JobHandler>>,
    poll_interval: Duration,
}

impl JobDispatcher {
    pub fn new(store: Arc<dyn JobStore>, poll_interval: Duration) -> Self {
        JobDispatcher {
            store,
            handlers: HashMap::new(),
            poll_interval,
        }
    }

    pub fn register_handler(&mut self, handler: Box<dyn JobHandler>) {
        self.handlers.insert(handler.job_type(), handler);
    }

    /// Poll until the token is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Job dispatcher started, polling every {:?}",
            self.poll_interval
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Job dispatcher shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Job dispatch cycle failed: {:#}", e);
                    }
                }
            }
        }
    }

    /// One dispatch cycle: claim and execute at most one job. A handler error
    /// is recorded on the job, not returned; only a store failure aborts the
    /// cycle.
    pub async fn run_cycle(&self) -> Result<()> {
        if let Some(job) = self.store.claim_next()? {
            self.dispatch(job).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, job: Job) -> Result<()> {
        let handler = match self.handlers.get(job.job_type.as_str()) {
            Some(handler) => handler,
            None => {
                warn!("No handler registered for job type {}", job.job_type);
                self.store.mark_failed(
                    &job.id,
                    &format!("No handler registered for job type {}", job.job_type),
                )?;
                return Ok(());
            }
        };

        match handler.execute(&job.payload).await {
            Ok(()) => {
                info!("Job {} ({}) completed", job.id, job.job_type);
                self.store.mark_completed(&job.id)?;
            }
            Err(e) => {
                warn!("Job {} ({}) failed: {:#}", job.id, job.job_type, e);
                self.store.mark_failed(&job.id, &format!("{:#}", e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_queue::models::JobStatus;
    use crate::job_queue::store::SqliteJobStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct FixedOutcomeHandler {
        job_type: &'static str,
        fail_with: Option<&'static str>,
        executions: Arc<AtomicI32>,
    }

    #[async_trait]
    impl JobHandler for FixedOutcomeHandler {
        fn job_type(&self) -> &'static str {
            self.job_type
        }

        async fn execute(&self, _payload: &str) -> Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(message) => Err(anyhow::anyhow!(message)),
                None => Ok(()),
            }
        }
    }

    fn dispatcher_with(
        store: Arc<SqliteJobStore>,
        handler: FixedOutcomeHandler,
    ) -> JobDispatcher {
        let mut dispatcher = JobDispatcher::new(store, Duration::from_millis(10));
        dispatcher.register_handler(Box::new(handler));
        dispatcher
    }

    #[tokio::test]
    async fn test_cycle_completes_successful_job() {
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let executions = Arc::new(AtomicI32::new(0));
        let dispatcher = dispatcher_with(
            store.clone(),
            FixedOutcomeHandler {
                job_type: "GREETING",
                fail_with: None,
                executions: executions.clone(),
            },
        );

        let job = store.enqueue("GREETING", &json!({})).unwrap();
        dispatcher.run_cycle().await.unwrap();

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        let stored = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_cycle_fails_job_on_handler_error() {
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let dispatcher = dispatcher_with(
            store.clone(),
            FixedOutcomeHandler {
                job_type: "GREETING",
                fail_with: Some("smtp timeout"),
                executions: Arc::new(AtomicI32::new(0)),
            },
        );

        let job = store.enqueue("GREETING", &json!({})).unwrap();
        dispatcher.run_cycle().await.unwrap();

        let stored = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.last_error.as_deref(), Some("smtp timeout"));
    }

    #[tokio::test]
    async fn test_unknown_job_type_is_failed_not_stuck() {
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let dispatcher = JobDispatcher::new(store.clone(), Duration::from_millis(10));

        let job = store.enqueue("MYSTERY", &json!({})).unwrap();
        dispatcher.run_cycle().await.unwrap();

        let stored = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored
            .last_error
            .as_deref()
            .unwrap()
            .contains("No handler registered"));
        // A later cycle must not pick it up again
        dispatcher.run_cycle().await.unwrap();
        let stored = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
    }

    #[tokio::test]
    async fn test_cycle_claims_exactly_one_job() {
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let executions = Arc::new(AtomicI32::new(0));
        let dispatcher = dispatcher_with(
            store.clone(),
            FixedOutcomeHandler {
                job_type: "GREETING",
                fail_with: None,
                executions: executions.clone(),
            },
        );

        for i in 0..5 {
            store.enqueue("GREETING", &json!({ "n": i })).unwrap();
        }

        dispatcher.run_cycle().await.unwrap();
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(store.count_by_status(JobStatus::Completed).unwrap(), 1);
        assert_eq!(store.count_by_status(JobStatus::Pending).unwrap(), 4);

        for _ in 0..4 {
            dispatcher.run_cycle().await.unwrap();
        }
        assert_eq!(executions.load(Ordering::SeqCst), 5);
        assert_eq!(store.count_by_status(JobStatus::Pending).unwrap(), 0);
    }

    struct SlowHandler {
        in_flight: Arc<AtomicI32>,
        overlap_seen: Arc<AtomicI32>,
    }

    #[async_trait]
    impl JobHandler for SlowHandler {
        fn job_type(&self) -> &'static str {
            "SLOW"
        }

        async fn execute(&self, _payload: &str) -> Result<()> {
            let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            if concurrent > 1 {
                self.overlap_seen.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_handler_never_runs_concurrently() {
        let store = Arc::new(SqliteJobStore::in_memory().unwrap());
        let overlap_seen = Arc::new(AtomicI32::new(0));
        // Poll interval much shorter than handler execution
        let mut dispatcher = JobDispatcher::new(store.clone(), Duration::from_millis(5));
        dispatcher.register_handler(Box::new(SlowHandler {
            in_flight: Arc::new(AtomicI32::new(0)),
            overlap_seen: overlap_seen.clone(),
        }));
        let dispatcher = Arc::new(dispatcher);

        for _ in 0..4 {
            store.enqueue("SLOW", &json!({})).unwrap();
        }

        let shutdown = CancellationToken::new();
        let task = {
            let dispatcher = dispatcher.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { dispatcher.run(shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(overlap_seen.load(Ordering::SeqCst), 0);
        assert_eq!(store.count_by_status(JobStatus::Completed).unwrap(), 4);
    }
}
