// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation engine: the HTTP client for the Generation Service, the
//! concurrent batch orchestrator, and result aggregation.
//!
//! The entry point is [`Orchestrator::generate`], which takes a finalized
//! selection from the conversation layer and returns a [`BatchResult`]
//! covering every requested style.

pub mod aggregate;
pub mod client;
pub mod orchestrator;
pub mod params;

pub use aggregate::{BatchResult, JobFailure, JobOutcome, OutboundPayload, render};
pub use client::GenerationClient;
pub use orchestrator::Orchestrator;
pub use params::{apply_config_update, resolve_params};
