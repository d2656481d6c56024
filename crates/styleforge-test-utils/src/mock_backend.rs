// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock Generation Service backend for deterministic testing.
//!
//! `MockGeneration` implements `GenerationBackend` with behavior scripted
//! per primary asset, so concurrent jobs resolve deterministically no
//! matter which order the scheduler runs them in. The default behavior is
//! to complete on the first poll with one image.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use styleforge_core::{
    GenerationBackend, GenerationRequest, ImageRef, JobId, JobStatus, StyleforgeError,
};

/// Scripted behavior for jobs whose request leads with a given asset.
#[derive(Debug, Clone)]
enum Behavior {
    /// Complete on the first poll with `image_count` images.
    Succeed { image_count: usize },
    /// Reject the submission itself.
    FailSubmit(String),
    /// Accept the submission, then report remote failure on poll.
    FailRemote(String),
    /// Stay in progress forever (exercises the job timeout).
    NeverComplete,
}

#[derive(Default)]
struct Inner {
    /// Behavior overrides keyed by the first style asset in the request.
    script: HashMap<String, Behavior>,
    /// Submitted job id -> behavior chosen at submit time.
    jobs: HashMap<String, Behavior>,
    /// Every request accepted or rejected, in arrival order.
    submissions: Vec<GenerationRequest>,
    poll_count: usize,
}

/// A mock Generation Service with per-asset scripted outcomes.
#[derive(Default)]
pub struct MockGeneration {
    inner: Mutex<Inner>,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs leading with `asset` fail at submission.
    pub async fn fail_submit_for(&self, asset: &str, reason: &str) {
        self.script(asset, Behavior::FailSubmit(reason.to_string()))
            .await;
    }

    /// Jobs leading with `asset` are accepted, then fail remotely.
    pub async fn fail_remote_for(&self, asset: &str, reason: &str) {
        self.script(asset, Behavior::FailRemote(reason.to_string()))
            .await;
    }

    /// Jobs leading with `asset` never leave the in-progress state.
    pub async fn never_complete_for(&self, asset: &str) {
        self.script(asset, Behavior::NeverComplete).await;
    }

    /// Jobs leading with `asset` succeed with `image_count` images.
    pub async fn images_for(&self, asset: &str, image_count: usize) {
        self.script(asset, Behavior::Succeed { image_count }).await;
    }

    /// Number of submissions that reached the service (including rejected
    /// ones).
    pub async fn submit_count(&self) -> usize {
        self.inner.lock().await.submissions.len()
    }

    /// Copies of every request seen, in arrival order.
    pub async fn submitted_requests(&self) -> Vec<GenerationRequest> {
        self.inner.lock().await.submissions.clone()
    }

    /// Number of status polls across all jobs.
    pub async fn poll_count(&self) -> usize {
        self.inner.lock().await.poll_count
    }

    async fn script(&self, asset: &str, behavior: Behavior) {
        self.inner
            .lock()
            .await
            .script
            .insert(asset.to_string(), behavior);
    }
}

#[async_trait]
impl GenerationBackend for MockGeneration {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, StyleforgeError> {
        let mut inner = self.inner.lock().await;
        inner.submissions.push(request.clone());

        let lead_asset = request
            .style_refs
            .first()
            .map(|s| s.asset.clone())
            .unwrap_or_default();
        let behavior = inner
            .script
            .get(&lead_asset)
            .cloned()
            .unwrap_or(Behavior::Succeed { image_count: 1 });

        if let Behavior::FailSubmit(reason) = &behavior {
            return Err(StyleforgeError::generation(reason.clone()));
        }

        let id = format!("mock-{}-{}", lead_asset, uuid::Uuid::new_v4());
        inner.jobs.insert(id.clone(), behavior);
        Ok(JobId(id))
    }

    async fn poll_status(&self, job: &JobId) -> Result<JobStatus, StyleforgeError> {
        let mut inner = self.inner.lock().await;
        inner.poll_count += 1;
        match inner.jobs.get(&job.0) {
            Some(Behavior::Succeed { .. }) => Ok(JobStatus::Completed),
            Some(Behavior::FailRemote(reason)) => Ok(JobStatus::Failed(reason.clone())),
            Some(Behavior::NeverComplete) => Ok(JobStatus::InProgress),
            Some(Behavior::FailSubmit(_)) | None => {
                Err(StyleforgeError::generation(format!("unknown job {job}")))
            }
        }
    }

    async fn fetch_result(&self, job: &JobId) -> Result<Vec<ImageRef>, StyleforgeError> {
        let inner = self.inner.lock().await;
        match inner.jobs.get(&job.0) {
            Some(Behavior::Succeed { image_count }) => Ok((0..*image_count)
                .map(|i| ImageRef {
                    url: format!("https://images.test/{}/{i}.png", job.0),
                    seed: Some(i as i64),
                })
                .collect()),
            _ => Err(StyleforgeError::generation(format!(
                "no result for job {job}"
            ))),
        }
    }
}
