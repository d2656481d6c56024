// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation Service backend trait.
//!
//! The remote image generation service is fire-and-poll: a submit returns a
//! job id, status is polled until completion or failure, and the result is
//! fetched separately. The real HTTP client and the test mock both
//! implement this trait.

use async_trait::async_trait;

use crate::error::StyleforgeError;
use crate::types::{GenerationRequest, ImageRef, JobId, JobStatus};

/// Boundary to the remote image generation service.
///
/// Implementations must tolerate the service being briefly unavailable
/// mid-poll by returning an error from `poll_status` rather than panicking;
/// callers treat a poll error as a job failure.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Submits a generation request, returning the remote job id.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, StyleforgeError>;

    /// Reports the current state of a submitted job.
    async fn poll_status(&self, job: &JobId) -> Result<JobStatus, StyleforgeError>;

    /// Fetches the rendered images of a completed job.
    async fn fetch_result(&self, job: &JobId) -> Result<Vec<ImageRef>, StyleforgeError>;
}
