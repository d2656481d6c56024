// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job outcomes, the batch aggregate, and the outbound rendering.
//!
//! Partial success is a first-class outcome: a batch succeeds if at least
//! one job produced images, and every failure is carried in the summary
//! rather than dropped.

use std::time::Duration;

use styleforge_core::ImageRef;
use thiserror::Error;

/// Why one generation job failed. These are expected outcomes reported to
/// the user, not internal errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    /// Sibling jobs consumed the balance before this job's debit ran.
    #[error("insufficient balance")]
    InsufficientBalance,
    /// The style no longer resolves in the catalog (changed since selection).
    #[error("style is no longer available")]
    StyleVanished,
    /// Submission to the Generation Service failed. The debit, if any, is
    /// not refunded.
    #[error("submission failed: {0}")]
    Submit(String),
    /// The service reported failure, or polling/fetching errored.
    #[error("remote failure: {0}")]
    Remote(String),
    /// The job did not complete within the configured deadline.
    #[error("timed out")]
    Timeout,
    /// Storage failure or task panic inside the job. Not user-caused.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The outcome of one job (one primary style).
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Primary style name the job was launched for.
    pub style_name: String,
    /// Asset references actually sent (primary plus attached secondaries).
    pub assets_used: Vec<String>,
    pub result: Result<Vec<ImageRef>, JobFailure>,
}

/// The combined outcome of all jobs in one generation batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub prompt: String,
    /// One entry per requested primary style, in selection order.
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
    /// Ledger balance after every job settled.
    pub remaining_balance: f64,
}

impl BatchResult {
    /// At least one job produced images.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_ok())
    }

    /// Outcomes that produced images, in order.
    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    /// Outcomes that failed, in order.
    pub fn failed(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Union of images across all successful jobs, in job order.
    pub fn images(&self) -> Vec<ImageRef> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .flat_map(|images| images.iter().cloned())
            .collect()
    }
}

/// What the transport layer delivers back to the account.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPayload {
    pub text: String,
    pub images: Vec<ImageRef>,
}

/// Render a batch result into a human-readable summary plus the flat
/// image list. Delivery is the transport layer's job.
pub fn render(result: &BatchResult) -> OutboundPayload {
    let mut lines = Vec::new();

    if result.is_success() {
        lines.push(format!("Prompt: \"{}\"", result.prompt));
    } else {
        lines.push(format!("Generation failed for \"{}\"", result.prompt));
    }

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(images) => lines.push(format!("✅ {}: {} image(s)", outcome.style_name, images.len())),
            Err(failure) => lines.push(format!("❌ {}: {failure}", outcome.style_name)),
        }
    }

    lines.push(format!(
        "Done in {:.1}s. Balance: {:.1}",
        result.elapsed.as_secs_f64(),
        result.remaining_balance
    ));

    OutboundPayload {
        text: lines.join("\n"),
        images: result.images(),
    }
}
