// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Styleforge image generation bot.
//!
//! This crate provides the error type, common identifiers, wire-level
//! request/response types, and the [`GenerationBackend`] trait implemented
//! by the HTTP client and the test mock. All other workspace crates build
//! on top of it.

pub mod backend;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use backend::GenerationBackend;
pub use error::StyleforgeError;
pub use types::{
    AccountId, GenerationRequest, ImageParams, ImageRef, JobId, JobStatus, MessageRef, StyleRef,
};
