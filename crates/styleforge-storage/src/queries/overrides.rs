// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account generation override CRUD.

use rusqlite::{OptionalExtension, params};
use styleforge_core::StyleforgeError;

use crate::database::{Database, map_tr_err};
use crate::models::OverrideRow;

/// Read an account's override row, if any. Absence is not an error.
pub async fn get_overrides(
    db: &Database,
    account_id: i64,
) -> Result<Option<OverrideRow>, StyleforgeError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT account_id, image_size, steps, guidance_scale, image_count, updated_at
                 FROM generation_overrides WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(OverrideRow {
                        account_id: row.get(0)?,
                        image_size: row.get(1)?,
                        steps: row.get(2)?,
                        guidance_scale: row.get(3)?,
                        image_count: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace an account's override row.
pub async fn upsert_overrides(db: &Database, row: &OverrideRow) -> Result<(), StyleforgeError> {
    let row = row.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO generation_overrides
                     (account_id, image_size, steps, guidance_scale, image_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(account_id) DO UPDATE SET
                     image_size = excluded.image_size,
                     steps = excluded.steps,
                     guidance_scale = excluded.guidance_scale,
                     image_count = excluded.image_count,
                     updated_at = excluded.updated_at",
                params![
                    row.account_id,
                    row.image_size,
                    row.steps,
                    row.guidance_scale,
                    row.image_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove an account's override row, reverting it to the defaults.
pub async fn clear_overrides(db: &Database, account_id: i64) -> Result<(), StyleforgeError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM generation_overrides WHERE account_id = ?1",
                params![account_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
