// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation parameter resolution.
//!
//! Per-account overrides are overlaid field-by-field on the configured
//! defaults. Absence of a row, or a NULL column, simply means "use the
//! default" and is never an error.

use styleforge_config::model::GenerationConfig;
use styleforge_conversation::ConfigUpdate;
use styleforge_core::{ImageParams, StyleforgeError};
use styleforge_storage::{Database, OverrideRow, queries};

/// Overlay an account's overrides (if any) on the configured defaults.
pub fn resolve_params(config: &GenerationConfig, overrides: Option<&OverrideRow>) -> ImageParams {
    let defaults = ImageParams {
        image_size: config.image_size.clone(),
        steps: config.steps,
        guidance_scale: config.guidance_scale,
        image_count: config.image_count,
    };

    let Some(row) = overrides else {
        return defaults;
    };

    ImageParams {
        image_size: row.image_size.clone().unwrap_or(defaults.image_size),
        steps: row.steps.unwrap_or(defaults.steps),
        guidance_scale: row.guidance_scale.unwrap_or(defaults.guidance_scale),
        image_count: row.image_count.unwrap_or(defaults.image_count),
    }
}

/// Persist a single override field for an account, leaving the others
/// as they were. A missing row starts from all-NULL, so untouched
/// fields keep falling through to the defaults.
pub async fn apply_config_update(
    db: &Database,
    account_id: i64,
    update: ConfigUpdate,
) -> Result<(), StyleforgeError> {
    let mut row = queries::overrides::get_overrides(db, account_id)
        .await?
        .unwrap_or(OverrideRow {
            account_id,
            image_size: None,
            steps: None,
            guidance_scale: None,
            image_count: None,
            updated_at: String::new(),
        });

    match update {
        ConfigUpdate::Steps(v) => row.steps = Some(v),
        ConfigUpdate::GuidanceScale(v) => row.guidance_scale = Some(v),
        ConfigUpdate::ImageCount(v) => row.image_count = Some(v),
    }

    queries::overrides::upsert_overrides(db, &row).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig {
            image_size: "1024x1024".into(),
            steps: 30,
            guidance_scale: 7.0,
            image_count: 1,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn no_row_yields_defaults() {
        let params = resolve_params(&config(), None);
        assert_eq!(params.image_size, "1024x1024");
        assert_eq!(params.steps, 30);
        assert_eq!(params.guidance_scale, 7.0);
        assert_eq!(params.image_count, 1);
    }

    #[test]
    fn partial_row_overlays_only_set_fields() {
        let row = OverrideRow {
            account_id: 1,
            image_size: None,
            steps: Some(50),
            guidance_scale: None,
            image_count: Some(4),
            updated_at: String::new(),
        };
        let params = resolve_params(&config(), Some(&row));
        assert_eq!(params.image_size, "1024x1024");
        assert_eq!(params.steps, 50);
        assert_eq!(params.guidance_scale, 7.0);
        assert_eq!(params.image_count, 4);
    }

    #[tokio::test]
    async fn config_update_creates_row_with_one_field_set() {
        let db = Database::open_in_memory().await.unwrap();
        apply_config_update(&db, 7, ConfigUpdate::Steps(50))
            .await
            .unwrap();

        let row = queries::overrides::get_overrides(&db, 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.steps, Some(50));
        assert_eq!(row.image_size, None);
        assert_eq!(row.guidance_scale, None);
        assert_eq!(row.image_count, None);
    }

    #[tokio::test]
    async fn config_update_preserves_other_overrides() {
        let db = Database::open_in_memory().await.unwrap();
        apply_config_update(&db, 7, ConfigUpdate::Steps(50))
            .await
            .unwrap();
        apply_config_update(&db, 7, ConfigUpdate::GuidanceScale(4.5))
            .await
            .unwrap();

        let row = queries::overrides::get_overrides(&db, 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.steps, Some(50));
        assert_eq!(row.guidance_scale, Some(4.5));

        let params = resolve_params(&config(), Some(&row));
        assert_eq!(params.steps, 50);
        assert_eq!(params.guidance_scale, 4.5);
        assert_eq!(params.image_count, 1);
    }

    #[test]
    fn full_row_replaces_everything() {
        let row = OverrideRow {
            account_id: 1,
            image_size: Some("512x768".into()),
            steps: Some(20),
            guidance_scale: Some(4.5),
            image_count: Some(2),
            updated_at: String::new(),
        };
        let params = resolve_params(&config(), Some(&row));
        assert_eq!(params.image_size, "512x768");
        assert_eq!(params.steps, 20);
        assert_eq!(params.guidance_scale, 4.5);
        assert_eq!(params.image_count, 2);
    }
}
