// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row structs for the migrated tables.

/// One row of the `balances` table.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub account_id: i64,
    pub balance: f64,
    pub updated_at: String,
}

/// One row of the `generation_overrides` table.
///
/// Every override column is nullable; `None` means "use the configured
/// default for this field", never a null-pointer sentinel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideRow {
    pub account_id: i64,
    pub image_size: Option<String>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub image_count: Option<u32>,
    pub updated_at: String,
}
