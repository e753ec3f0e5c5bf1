//! Export prices query
//!
//! The read side of the pipeline: a filter-driven query over stored records
//! and repackaging of the result as a CSV inside a zip archive. The whole
//! result is buffered in memory and returned as one unit.

use std::io::{Cursor, Write};

use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder};
use zip::write::SimpleFileOptions;

use crate::features::prices::types::{ExportFilters, FilterError};

/// Query to export stored price records matching the given filters
#[derive(Debug, Clone, Default)]
pub struct ExportPricesQuery {
    pub filters: ExportFilters,
}

/// Errors that abort an export call
#[derive(Debug, thiserror::Error)]
pub enum ExportPricesError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("buffer write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One exported row, as stored. `price` is the canonical decimal text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: String,
    pub create_date: NaiveDate,
}

/// Handler function for exporting prices.
///
/// Validates filters before any query runs, then returns a zip archive with
/// a single `data.csv` entry ordered by date, category, name.
#[tracing::instrument(skip(pool), fields(filters = ?query.filters))]
pub async fn handle(pool: PgPool, query: ExportPricesQuery) -> Result<Vec<u8>, ExportPricesError> {
    query.filters.validate()?;

    let rows = fetch_rows(&pool, &query.filters).await?;

    tracing::debug!(rows = rows.len(), "Export query matched rows");

    package_zip(&rows)
}

async fn fetch_rows(pool: &PgPool, filters: &ExportFilters) -> Result<Vec<ExportRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<sqlx::Postgres>::new(
        "SELECT id, name, category, price::text AS price, create_date FROM prices WHERE 1=1",
    );

    if let Some(start) = filters.start {
        builder.push(" AND create_date >= ").push_bind(start);
    }
    if let Some(end) = filters.end {
        builder.push(" AND create_date <= ").push_bind(end);
    }
    // Integer thresholds are whole currency units: min=5 matches 5.00 and up.
    if let Some(min) = filters.min {
        builder
            .push(" AND price >= ")
            .push_bind(format!("{}.00", min))
            .push("::numeric");
    }
    if let Some(max) = filters.max {
        builder
            .push(" AND price <= ")
            .push_bind(format!("{}.00", max))
            .push("::numeric");
    }

    builder.push(" ORDER BY create_date, category, name");

    builder.build_query_as::<ExportRow>().fetch_all(pool).await
}

/// Serialize rows as `data.csv` inside an in-memory zip archive.
fn package_zip(rows: &[ExportRow]) -> Result<Vec<u8>, ExportPricesError> {
    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    csv_writer.write_record(["id", "name", "category", "price", "create_date"])?;
    for row in rows {
        csv_writer.write_record([
            row.id.to_string(),
            row.name.clone(),
            row.category.clone(),
            row.price.clone(),
            row.create_date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    let csv_bytes = csv_writer
        .into_inner()
        .map_err(|e| ExportPricesError::Io(e.into_error()))?;

    let mut zip_writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip_writer.start_file("data.csv", SimpleFileOptions::default())?;
    zip_writer.write_all(&csv_bytes)?;
    let cursor = zip_writer.finish()?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn row(id: i64, name: &str, category: &str, price: &str, date: &str) -> ExportRow {
        ExportRow {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price: price.to_string(),
            create_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    fn unzip_data_csv(zip_bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut file = archive.by_name("data.csv").unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn test_package_zip_single_entry_with_header() {
        let zip_bytes = package_zip(&[]).unwrap();
        let csv = unzip_data_csv(&zip_bytes);
        assert_eq!(csv, "id,name,category,price,create_date\n");
    }

    #[test]
    fn test_package_zip_preserves_row_order_and_format() {
        let rows = vec![
            row(1, "Apple", "Fruit", "1.50", "2024-01-01"),
            row(2, "Desk", "Furniture", "120.00", "2024-01-02"),
        ];
        let zip_bytes = package_zip(&rows).unwrap();
        let csv = unzip_data_csv(&zip_bytes);
        assert_eq!(
            csv,
            "id,name,category,price,create_date\n\
             1,Apple,Fruit,1.50,2024-01-01\n\
             2,Desk,Furniture,120.00,2024-01-02\n"
        );
    }

    #[test]
    fn test_package_zip_quotes_fields_with_commas() {
        let rows = vec![row(7, "Nuts, mixed", "Snacks", "3.25", "2024-03-03")];
        let zip_bytes = package_zip(&rows).unwrap();
        let csv = unzip_data_csv(&zip_bytes);
        assert!(csv.contains("\"Nuts, mixed\""));
    }
}
