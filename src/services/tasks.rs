// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process task queue for webhook-triggered work.
//!
//! Webhook handlers must answer Strava quickly, so they only enqueue a
//! [`SyncJob`]. A single worker task drains the queue and runs the
//! pipeline. Failures are logged; Strava has already been sent its 200.

use crate::error::{AppError, Result};
use crate::services::pipeline::Pipeline;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Work triggered by a webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    /// Fetch the activity and upsert it (create or update events).
    Upsert { activity_id: i64 },
    /// Remove the activity row (delete events).
    Delete { activity_id: i64 },
}

/// Sending side of the job queue, shared with the HTTP handlers.
#[derive(Clone)]
pub struct TasksService {
    sender: mpsc::UnboundedSender<SyncJob>,
}

impl TasksService {
    /// Create the queue. The receiver goes to [`spawn_worker`].
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a single activity for fetch + upsert.
    pub fn queue_activity(&self, activity_id: i64) -> Result<()> {
        self.queue(SyncJob::Upsert { activity_id })
    }

    /// Queue an activity deletion.
    pub fn queue_delete(&self, activity_id: i64) -> Result<()> {
        self.queue(SyncJob::Delete { activity_id })
    }

    fn queue(&self, job: SyncJob) -> Result<()> {
        tracing::debug!(job = ?job, "Queueing sync job");
        self.sender
            .send(job)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Sync worker is gone: {:?}", e.0)))
    }
}

/// Run one job to completion.
pub async fn process_job(pipeline: &Pipeline, job: &SyncJob) -> Result<()> {
    match *job {
        SyncJob::Upsert { activity_id } => pipeline.sync_one(activity_id).await.map(|_| ()),
        SyncJob::Delete { activity_id } => pipeline.remove(activity_id).await.map(|_| ()),
    }
}

/// Drain the queue until every sender has been dropped.
pub async fn run_worker(pipeline: Arc<Pipeline>, mut receiver: mpsc::UnboundedReceiver<SyncJob>) {
    tracing::info!("Sync worker started");

    while let Some(job) = receiver.recv().await {
        match process_job(&pipeline, &job).await {
            Ok(()) => tracing::debug!(job = ?job, "Sync job done"),
            Err(AppError::NotFound(activity_id)) => {
                tracing::warn!(activity_id, "Activity no longer exists on Strava, skipping");
            }
            Err(e) if e.is_upstream() => {
                tracing::warn!(job = ?job, error = %e, "Strava request failed, skipping job");
            }
            Err(e) => tracing::error!(job = ?job, error = %e, "Sync job failed"),
        }
    }

    tracing::info!("Sync worker stopped");
}

/// Spawn [`run_worker`] on the current runtime.
pub fn spawn_worker(
    pipeline: Arc<Pipeline>,
    receiver: mpsc::UnboundedReceiver<SyncJob>,
) -> JoinHandle<()> {
    tokio::spawn(run_worker(pipeline, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_delivers_jobs_in_order() {
        let (tasks, mut receiver) = TasksService::new();
        tasks.queue_activity(1).unwrap();
        tasks.queue_delete(2).unwrap();

        assert_eq!(receiver.try_recv().unwrap(), SyncJob::Upsert { activity_id: 1 });
        assert_eq!(receiver.try_recv().unwrap(), SyncJob::Delete { activity_id: 2 });
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_queue_errors_when_worker_dropped() {
        let (tasks, receiver) = TasksService::new();
        drop(receiver);
        assert!(matches!(tasks.queue_activity(1), Err(AppError::Internal(_))));
    }
}
