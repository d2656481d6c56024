// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static style catalog, loaded once from configuration.
//!
//! Styles carry a content-addressed id derived from name, asset, and
//! weight, so reloading identical config yields identical ids (callback
//! payloads embedded in old chat keyboards stay valid across restarts).
//! The catalog is read-only after construction and needs no locking.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use styleforge_config::model::{AccountEntry, StyleEntry, StyleforgeConfig};
use styleforge_core::{AccountId, StyleRef};
use tracing::info;

/// An immutable style definition (primary or secondary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Stable content-addressed id: hex(sha256(name|asset|weight))[..16].
    pub id: String,
    /// Display name, unique within its list.
    pub name: String,
    /// Remote asset reference sent to the Generation Service.
    pub asset: String,
    /// Scale factor applied to the asset.
    pub weight: f64,
    /// Visibility groups. Empty = visible to everyone.
    pub groups: Vec<String>,
}

impl Style {
    fn from_entry(entry: &StyleEntry) -> Self {
        Self {
            id: style_id(&entry.name, &entry.asset, entry.weight),
            name: entry.name.clone(),
            asset: entry.asset.clone(),
            weight: entry.weight,
            groups: entry.groups.clone(),
        }
    }

    /// The wire-level reference for this style.
    pub fn style_ref(&self) -> StyleRef {
        StyleRef {
            asset: self.asset.clone(),
            weight: self.weight,
        }
    }
}

/// Derive the stable id for a style definition.
pub fn style_id(name: &str, asset: &str, weight: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(asset.as_bytes());
    hasher.update(b"|");
    hasher.update(weight.to_bits().to_le_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

#[derive(Debug, Clone, Default)]
struct AccountInfo {
    groups: HashSet<String>,
    elevated: bool,
}

impl AccountInfo {
    fn from_entry(entry: &AccountEntry) -> Self {
        Self {
            groups: entry.groups.iter().cloned().collect(),
            elevated: entry.elevated,
        }
    }
}

/// Loaded-once lookup from ids and names to style definitions, plus
/// per-account visibility.
pub struct StyleCatalog {
    primary: Vec<Style>,
    secondary: Vec<Style>,
    accounts: HashMap<i64, AccountInfo>,
}

impl StyleCatalog {
    /// Build the catalog from configuration. Config order is preserved so
    /// keyboards render styles in the order operators wrote them.
    pub fn from_config(config: &StyleforgeConfig) -> Self {
        let primary: Vec<Style> = config.styles.iter().map(Style::from_entry).collect();
        let secondary: Vec<Style> = config
            .secondary_styles
            .iter()
            .map(Style::from_entry)
            .collect();
        let accounts = config
            .accounts
            .iter()
            .map(|a| (a.id, AccountInfo::from_entry(a)))
            .collect();

        info!(
            primary = primary.len(),
            secondary = secondary.len(),
            accounts = config.accounts.len(),
            "style catalog loaded"
        );
        Self {
            primary,
            secondary,
            accounts,
        }
    }

    /// All primary styles, in config order.
    pub fn primary_styles(&self) -> &[Style] {
        &self.primary
    }

    /// All secondary styles, in config order.
    pub fn secondary_styles(&self) -> &[Style] {
        &self.secondary
    }

    /// Primary styles visible to the given account, in config order.
    pub fn visible_styles(&self, account: AccountId) -> Vec<&Style> {
        self.visible_in(&self.primary, account)
    }

    /// Secondary styles visible to the given account, in config order.
    pub fn visible_secondary_styles(&self, account: AccountId) -> Vec<&Style> {
        self.visible_in(&self.secondary, account)
    }

    /// Look up any style (primary first, then secondary) by id.
    pub fn find_by_id(&self, id: &str) -> Option<&Style> {
        self.primary
            .iter()
            .chain(&self.secondary)
            .find(|s| s.id == id)
    }

    /// Look up a primary style by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Style> {
        self.primary.iter().find(|s| s.name == name)
    }

    /// Look up a secondary style by display name.
    pub fn find_secondary_by_name(&self, name: &str) -> Option<&Style> {
        self.secondary.iter().find(|s| s.name == name)
    }

    fn visible_in<'a>(&'a self, styles: &'a [Style], account: AccountId) -> Vec<&'a Style> {
        let info = self.accounts.get(&account.0);
        let elevated = info.map(|a| a.elevated).unwrap_or(false);
        styles
            .iter()
            .filter(|style| {
                elevated
                    || style.groups.is_empty()
                    || info.is_some_and(|a| style.groups.iter().any(|g| a.groups.contains(g)))
            })
            .collect()
    }
}
