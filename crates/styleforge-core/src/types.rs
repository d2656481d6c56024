// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Styleforge workspace.

use serde::{Deserialize, Serialize};

/// External account identity. The core never owns accounts; it only keys
/// state, balances, and jobs by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a transport-layer message, used so the transport can
/// edit the message that displays the current conversation step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef(pub String);

/// Identifier assigned by the Generation Service when a job is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One generated image as referenced by the Generation Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Download URL for the rendered image.
    pub url: String,
    /// Seed used by the remote sampler, when reported.
    pub seed: Option<i64>,
}

/// A weighted reference to a remote style asset, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRef {
    /// Remote asset identifier (e.g. a LoRA file reference).
    pub asset: String,
    /// Scale factor applied to the asset.
    pub weight: f64,
}

/// Image generation parameters after per-account overrides are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageParams {
    /// Output resolution, e.g. "1024x1024".
    pub image_size: String,
    /// Sampler step count.
    pub steps: u32,
    /// Classifier-free guidance scale.
    pub guidance_scale: f64,
    /// Number of images to render per job.
    pub image_count: u32,
}

/// A fully-built request for one generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style_refs: Vec<StyleRef>,
    pub params: ImageParams,
}

/// Remote job state as reported by the Generation Service poll endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed(String),
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
