// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive costs, endpoint URLs, and unique style
//! names. All failures are collected; validation never stops at the first
//! error.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::StyleforgeConfig;

/// A configuration error, either from Figment extraction or from the
/// semantic validation pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing or extraction failed.
    #[error("config parse error: {message}")]
    Parse { message: String },

    /// A deserialized value violates a semantic constraint.
    #[error("config validation error: {message}")]
    Validation { message: String },
}

/// Print collected configuration errors to stderr, one per line.
///
/// Called before tracing is initialized, so this writes directly.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("styleforge: {error}");
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &StyleforgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    if config.billing.cost_per_job <= 0.0 {
        errors.push(validation(format!(
            "billing.cost_per_job must be positive, got {}",
            config.billing.cost_per_job
        )));
    }

    if config.billing.starting_balance < 0.0 {
        errors.push(validation(format!(
            "billing.starting_balance must be non-negative, got {}",
            config.billing.starting_balance
        )));
    }

    if config.generation.endpoints.is_empty() {
        errors.push(validation(
            "generation.endpoints must list at least one Generation Service URL",
        ));
    }
    for endpoint in &config.generation.endpoints {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(validation(format!(
                "generation.endpoints entry `{endpoint}` must be an http(s) URL"
            )));
        }
    }

    if config.generation.max_styles_per_request == 0 {
        errors.push(validation(
            "generation.max_styles_per_request must be at least 1",
        ));
    }

    if config.generation.max_selected_styles == 0 {
        errors.push(validation(
            "generation.max_selected_styles must be at least 1",
        ));
    }

    if config.generation.poll_interval_ms == 0 {
        errors.push(validation("generation.poll_interval_ms must be positive"));
    }

    let job_timeout_ms = config.generation.job_timeout_secs.saturating_mul(1_000);
    if config.generation.poll_interval_ms >= job_timeout_ms {
        errors.push(validation(format!(
            "generation.poll_interval_ms ({} ms) must be shorter than generation.job_timeout_secs ({} s)",
            config.generation.poll_interval_ms, config.generation.job_timeout_secs
        )));
    }

    check_unique_names("styles", &config.styles, &mut errors);
    check_unique_names("secondary_styles", &config.secondary_styles, &mut errors);

    for entry in config.styles.iter().chain(&config.secondary_styles) {
        if !entry.weight.is_finite() || entry.weight <= 0.0 {
            errors.push(validation(format!(
                "style `{}` has invalid weight {}",
                entry.name, entry.weight
            )));
        }
        if entry.asset.trim().is_empty() {
            errors.push(validation(format!(
                "style `{}` has an empty asset reference",
                entry.name
            )));
        }
    }

    let mut seen_accounts = HashSet::new();
    for account in &config.accounts {
        if !seen_accounts.insert(account.id) {
            errors.push(validation(format!(
                "duplicate account id {} in [[accounts]]",
                account.id
            )));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_unique_names(
    section: &str,
    entries: &[crate::model::StyleEntry],
    errors: &mut Vec<ConfigError>,
) {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.name.trim().is_empty() {
            errors.push(validation(format!(
                "[[{section}]] entry has an empty name"
            )));
        }
        if !seen.insert(entry.name.as_str()) {
            errors.push(validation(format!(
                "duplicate name `{}` in [[{section}]]",
                entry.name
            )));
        }
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
