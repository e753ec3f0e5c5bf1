//! Import prices command
//!
//! The write side of the pipeline: archive dispatch, CSV parsing, two-layer
//! deduplication, one-transaction persistence, and global aggregate
//! recomputation.
//!
//! # Deduplication layers
//!
//! 1. An in-process set scoped to this call catches intra-batch duplicates
//!    before they reach the database (name and category compared
//!    case-insensitively, price by canonical cents).
//! 2. The `ux_prices_dedupe` UNIQUE constraint with `ON CONFLICT DO NOTHING`
//!    is the authoritative guard against rows persisted by earlier calls and
//!    by concurrent imports.
//!
//! Either layer reporting a duplicate bumps `duplicates_count`; neither is an
//! error. Any persistence failure rolls the whole call back.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::features::prices::types::{total_price_value, ImportResult, PriceRecord};
use crate::ingest::{self, ArchiveError, ArchiveKind, CsvImportError};

/// Command to import one uploaded archive of price records
#[derive(Debug)]
pub struct ImportPricesCommand {
    /// Caller-declared container format.
    pub kind: ArchiveKind,
    /// Raw archive bytes.
    pub data: Vec<u8>,
}

/// Errors that abort an import call
#[derive(Debug, thiserror::Error)]
pub enum ImportPricesError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Csv(#[from] CsvImportError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handler function for importing prices.
///
/// Parses the whole CSV into memory before any write begins, then commits
/// every surviving candidate in a single transaction; on any database error
/// nothing from this call is persisted.
#[tracing::instrument(skip(pool, command), fields(kind = ?command.kind, bytes = command.data.len()))]
pub async fn handle(
    pool: PgPool,
    command: ImportPricesCommand,
) -> Result<ImportResult, ImportPricesError> {
    let csv_bytes = ingest::extract_csv(&command.data, command.kind)?;
    let batch = ingest::parse_records(&csv_bytes)?;

    let rejected = batch.total_count - batch.records.len() as i64;
    let (candidates, batch_duplicates) = split_batch(batch.records);

    let mut tx = pool.begin().await?;

    let mut inserted: i64 = 0;
    let mut duplicates = batch_duplicates;

    for record in &candidates {
        let result = sqlx::query(
            r#"
            INSERT INTO prices (name, category, price, create_date)
            VALUES ($1, $2, $3::numeric, $4)
            ON CONFLICT (name, category, price, create_date) DO NOTHING
            "#,
        )
        .bind(&record.name)
        .bind(&record.category)
        .bind(&record.price_decimal)
        .bind(record.create_date)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            duplicates += 1;
        } else {
            inserted += 1;
        }
    }

    tx.commit().await?;

    // Global aggregates over all stored rows, recomputed from storage truth
    // rather than tracked incrementally.
    let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT category) FROM prices")
        .fetch_one(&pool)
        .await?;

    let sum_text: String = sqlx::query_scalar("SELECT COALESCE(SUM(price), 0)::text FROM prices")
        .fetch_one(&pool)
        .await?;

    tracing::info!(
        total = batch.total_count,
        inserted,
        duplicates,
        rejected,
        "Import committed"
    );

    Ok(ImportResult {
        total_count: batch.total_count,
        duplicates_count: duplicates,
        total_items: inserted,
        total_categories,
        total_price: total_price_value(&sum_text),
    })
}

/// Intra-batch dedup: partition candidates into first-seen records and a
/// duplicate count, keyed by lower-cased (name, category) plus canonical
/// cents and date.
fn split_batch(records: Vec<PriceRecord>) -> (Vec<PriceRecord>, i64) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates: i64 = 0;

    for record in records {
        let key = (
            record.name.to_lowercase(),
            record.category.to_lowercase(),
            record.price_cents,
            record.create_date,
        );
        if seen.insert(key) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }

    (unique, duplicates)
}
