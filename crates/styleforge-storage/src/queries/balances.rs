// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balance table operations.
//!
//! All mutations run as a single transaction inside one tokio-rusqlite
//! `call` closure, so a read-check-write sequence can never interleave with
//! another caller's. Policy (costs, logging, outcome types) lives in
//! `styleforge-ledger`; this module is mechanical SQL.

use rusqlite::{OptionalExtension, params};
use styleforge_core::StyleforgeError;

use crate::database::{Database, map_tr_err};
use crate::models::BalanceRow;

const UPSERT_BALANCE: &str = "INSERT INTO balances (account_id, balance, updated_at)
     VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
     ON CONFLICT(account_id) DO UPDATE SET
         balance = excluded.balance,
         updated_at = excluded.updated_at";

/// Read a balance row. Never creates a row.
pub async fn get_row(db: &Database, account_id: i64) -> Result<Option<BalanceRow>, StyleforgeError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT account_id, balance, updated_at FROM balances WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(BalanceRow {
                        account_id: row.get(0)?,
                        balance: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically deduct `cost` if the stored (or implicit starting) balance
/// covers it.
///
/// Returns `Some(remaining)` on success. Returns `None` without touching
/// the table when the balance is insufficient -- a failed debit must not
/// create the lazy row either.
pub async fn debit_if_sufficient(
    db: &Database,
    account_id: i64,
    cost: f64,
    starting_balance: f64,
) -> Result<Option<f64>, StyleforgeError> {
    db.connection()
        .call(move |conn| -> Result<Option<f64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let balance: f64 = tx
                .query_row(
                    "SELECT balance FROM balances WHERE account_id = ?1",
                    params![account_id],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(starting_balance);

            if balance < cost {
                tx.rollback()?;
                return Ok(None);
            }

            let remaining = balance - cost;
            tx.execute(UPSERT_BALANCE, params![account_id, remaining])?;
            tx.commit()?;
            Ok(Some(remaining))
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically add `amount` to the stored (or implicit starting) balance,
/// returning the new balance.
pub async fn add(
    db: &Database,
    account_id: i64,
    amount: f64,
    starting_balance: f64,
) -> Result<f64, StyleforgeError> {
    db.connection()
        .call(move |conn| -> Result<f64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let balance: f64 = tx
                .query_row(
                    "SELECT balance FROM balances WHERE account_id = ?1",
                    params![account_id],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(starting_balance);

            let updated = balance + amount;
            tx.execute(UPSERT_BALANCE, params![account_id, updated])?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the stored balance (administrative).
pub async fn set(db: &Database, account_id: i64, amount: f64) -> Result<(), StyleforgeError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(UPSERT_BALANCE, params![account_id, amount])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_row_on_empty_table_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        let row = get_row(&db, 1).await.unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn debit_uses_starting_balance_for_missing_row() {
        let db = Database::open_in_memory().await.unwrap();
        let remaining = debit_if_sufficient(&db, 1, 3.0, 10.0).await.unwrap();
        assert_eq!(remaining, Some(7.0));

        let row = get_row(&db, 1).await.unwrap().unwrap();
        assert_eq!(row.balance, 7.0);
        assert!(!row.updated_at.is_empty());
    }

    #[tokio::test]
    async fn insufficient_debit_leaves_table_untouched() {
        let db = Database::open_in_memory().await.unwrap();
        let remaining = debit_if_sufficient(&db, 1, 20.0, 10.0).await.unwrap();
        assert_eq!(remaining, None);
        // The lazy row must not be created by a failed debit.
        assert!(get_row(&db, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_creates_then_accumulates() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(add(&db, 2, 5.0, 10.0).await.unwrap(), 15.0);
        assert_eq!(add(&db, 2, 2.5, 10.0).await.unwrap(), 17.5);
    }

    #[tokio::test]
    async fn set_overwrites_any_previous_value() {
        let db = Database::open_in_memory().await.unwrap();
        add(&db, 3, 5.0, 0.0).await.unwrap();
        set(&db, 3, 100.0).await.unwrap();
        assert_eq!(get_row(&db, 3).await.unwrap().unwrap().balance, 100.0);
    }
}
