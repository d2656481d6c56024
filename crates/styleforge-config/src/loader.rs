// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./styleforge.toml` > `~/.config/styleforge/styleforge.toml`
//! > `/etc/styleforge/styleforge.toml` with environment variable overrides
//! via `STYLEFORGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StyleforgeConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/styleforge/styleforge.toml` (system-wide)
/// 3. `~/.config/styleforge/styleforge.toml` (user XDG config)
/// 4. `./styleforge.toml` (local directory)
/// 5. `STYLEFORGE_*` environment variables
pub fn load_config() -> Result<StyleforgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StyleforgeConfig::default()))
        .merge(Toml::file("/etc/styleforge/styleforge.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("styleforge/styleforge.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("styleforge.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<StyleforgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StyleforgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StyleforgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StyleforgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `STYLEFORGE_BILLING_COST_PER_JOB` must
/// map to `billing.cost_per_job`, not `billing.cost.per.job`.
fn env_provider() -> Env {
    Env::prefixed("STYLEFORGE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("billing_", "billing.", 1)
            .replacen("generation_", "generation.", 1);
        mapped.into()
    })
}
