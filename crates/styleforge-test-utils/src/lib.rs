// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Styleforge workspace.
//!
//! Provides a deterministic mock of the Generation Service so orchestrator
//! and integration tests run fast with no network access.

pub mod mock_backend;

pub use mock_backend::MockGeneration;
