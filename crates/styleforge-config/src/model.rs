// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Styleforge bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Styleforge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; a deployment without `[[styles]]` entries is valid but offers
/// nothing to generate with.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StyleforgeConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-job billing settings.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Generation Service endpoints, timeouts, and image defaults.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Primary style catalog entries.
    #[serde(default)]
    pub styles: Vec<StyleEntry>,

    /// Secondary style catalog entries.
    #[serde(default)]
    pub secondary_styles: Vec<StyleEntry>,

    /// Known accounts with group memberships and privileges.
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "styleforge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("styleforge").join("styleforge.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "styleforge.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Per-job billing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Credits deducted per generation job (one job per primary style).
    #[serde(default = "default_cost_per_job")]
    pub cost_per_job: f64,

    /// Balance granted implicitly to accounts with no ledger row yet.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cost_per_job: default_cost_per_job(),
            starting_balance: default_starting_balance(),
        }
    }
}

fn default_cost_per_job() -> f64 {
    1.0
}

fn default_starting_balance() -> f64 {
    10.0
}

/// Generation Service and image parameter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Ordered Generation Service endpoints. The client advances to the
    /// next entry when the current one reports a transient failure.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Timeout for a single submit/poll/fetch HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on one job's lifetime from submit to result, in seconds.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Maximum combined primary + secondary styles a user may select.
    #[serde(default = "default_max_selected_styles")]
    pub max_selected_styles: usize,

    /// Maximum style assets attachable to a single remote request.
    #[serde(default = "default_max_styles_per_request")]
    pub max_styles_per_request: usize,

    /// Default output resolution.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// Default sampler step count.
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Default guidance scale.
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,

    /// Default number of images per job.
    #[serde(default = "default_image_count")]
    pub image_count: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            max_selected_styles: default_max_selected_styles(),
            max_styles_per_request: default_max_styles_per_request(),
            image_size: default_image_size(),
            steps: default_steps(),
            guidance_scale: default_guidance_scale(),
            image_count: default_image_count(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://localhost:7860".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_max_selected_styles() -> usize {
    4
}

fn default_max_styles_per_request() -> usize {
    3
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_steps() -> u32 {
    30
}

fn default_guidance_scale() -> f64 {
    7.0
}

fn default_image_count() -> u32 {
    1
}

/// One style catalog entry (primary or secondary).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StyleEntry {
    /// Display name, unique within its list.
    pub name: String,

    /// Remote asset reference sent to the Generation Service.
    pub asset: String,

    /// Scale factor applied to the asset.
    #[serde(default = "default_style_weight")]
    pub weight: f64,

    /// Visibility groups. Empty = visible to every configured account.
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_style_weight() -> f64 {
    1.0
}

/// One known account with group memberships.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountEntry {
    /// External account id (chat platform user id).
    pub id: i64,

    /// Group memberships used for style visibility.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Elevated accounts see every style regardless of groups.
    #[serde(default)]
    pub elevated: bool,
}
