//! CSV record parsing and per-row validation
//!
//! The parser maps required columns by header name (case-insensitive),
//! validates every data row, and canonicalizes prices. Validation failures
//! are row-scoped: a bad row is skipped and counted, never an error for the
//! whole import. Only a missing required column aborts.

use chrono::NaiveDate;
use prices_common::price;
use thiserror::Error;
use tracing::warn;

use crate::features::prices::types::PriceRecord;

/// Result of parsing one CSV payload
#[derive(Debug)]
pub struct ParsedBatch {
    /// Validated candidate records, in file order.
    pub records: Vec<PriceRecord>,
    /// Data lines read, including rejected and unparseable ones.
    pub total_count: i64,
}

/// Errors that abort the whole import before any persistence
#[derive(Error, Debug)]
pub enum CsvImportError {
    #[error("failed to read csv header: {0}")]
    Header(#[from] csv::Error),

    #[error("csv missing required column '{0}'")]
    MissingColumn(&'static str),
}

struct ColumnIndex {
    name: usize,
    category: usize,
    price: usize,
    create_date: usize,
    id: Option<usize>,
}

impl ColumnIndex {
    fn from_header(header: &csv::StringRecord) -> Result<Self, CsvImportError> {
        let position = |col: &'static str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(col))
                .ok_or(CsvImportError::MissingColumn(col))
        };

        Ok(Self {
            name: position("name")?,
            category: position("category")?,
            price: position("price")?,
            create_date: position("create_date")?,
            id: position("id").ok(),
        })
    }
}

/// Parse a CSV payload into validated candidate records.
pub fn parse_records(csv_bytes: &[u8]) -> Result<ParsedBatch, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(csv_bytes);

    let header = reader.headers()?.clone();
    let columns = ColumnIndex::from_header(&header)?;

    let mut records = Vec::new();
    let mut total_count: i64 = 0;

    for row in reader.records() {
        total_count += 1;

        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line = total_count, error = %err, "csv read error, skipping line");
                continue;
            },
        };

        match parse_row(&row, &columns) {
            Some(record) => records.push(record),
            None => continue,
        }
    }

    Ok(ParsedBatch {
        records,
        total_count,
    })
}

/// Validate one data row. `None` means the row is rejected (but still counted
/// by the caller).
fn parse_row(row: &csv::StringRecord, columns: &ColumnIndex) -> Option<PriceRecord> {
    let cell = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");

    let name = cell(columns.name);
    let category = cell(columns.category);
    let price_text = cell(columns.price);
    let date_text = cell(columns.create_date);

    if name.is_empty() || category.is_empty() || price_text.is_empty() || date_text.is_empty() {
        return None;
    }

    let price = price::canonicalize(price_text).ok()?;
    let create_date = parse_date(date_text)?;

    let source_id = columns
        .id
        .map(|idx| cell(idx))
        .and_then(|s| s.parse::<i64>().ok());

    Some(PriceRecord {
        name: name.to_string(),
        category: category.to_string(),
        price_cents: price.cents,
        price_decimal: price.text,
        create_date,
        source_id,
    })
}

/// Strict `YYYY-MM-DD` only; chrono alone would also accept unpadded fields.
fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParsedBatch {
        parse_records(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_parses_valid_rows() {
        let batch = parse(
            "id,name,category,price,create_date\n\
             1,Apple,Fruit,1.50,2024-01-01\n\
             2,Banana,Fruit,0.75,2024-01-02\n",
        );
        assert_eq!(batch.total_count, 2);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].name, "Apple");
        assert_eq!(batch.records[0].price_cents, 150);
        assert_eq!(batch.records[0].price_decimal, "1.50");
        assert_eq!(batch.records[0].source_id, Some(1));
    }

    #[test]
    fn test_header_mapping_is_case_insensitive_and_order_free() {
        let batch = parse(
            "PRICE,Create_Date,NAME,Category\n\
             2.00,2024-05-05,Pen,Office\n",
        );
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].category, "Office");
        assert_eq!(batch.records[0].price_decimal, "2.00");
        assert_eq!(batch.records[0].source_id, None);
    }

    #[test]
    fn test_missing_required_column_aborts() {
        let result = parse_records(b"id,name,price,create_date\n1,Apple,1.50,2024-01-01\n");
        assert!(matches!(
            result,
            Err(CsvImportError::MissingColumn("category"))
        ));
    }

    #[test]
    fn test_first_missing_column_is_reported() {
        // Several required columns absent; the lookup fails on the first one
        // rather than falling back to any existing index.
        let result = parse_records(b"price,create_date\n1.50,2024-01-01\n");
        assert!(matches!(result, Err(CsvImportError::MissingColumn("name"))));
    }

    #[test]
    fn test_cells_are_trimmed() {
        let batch = parse("name,category,price,create_date\n  Apple , Fruit , 1.5 , 2024-01-01 \n");
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].name, "Apple");
        assert_eq!(batch.records[0].category, "Fruit");
    }

    #[test]
    fn test_empty_field_rejects_row_but_counts_it() {
        let batch = parse(
            "name,category,price,create_date\n\
             ,Fruit,1.50,2024-01-01\n\
             Apple,Fruit,1.50,2024-01-01\n",
        );
        assert_eq!(batch.total_count, 2);
        assert_eq!(batch.records.len(), 1);
    }

    #[test]
    fn test_bad_price_and_bad_date_reject_rows() {
        let batch = parse(
            "name,category,price,create_date\n\
             Apple,Fruit,1:50,2024-01-01\n\
             Apple,Fruit,0,2024-01-01\n\
             Apple,Fruit,1.50,01-01-2024\n\
             Apple,Fruit,1.50,2024-1-1\n\
             Pear,Fruit,2.50,2024-01-01\n",
        );
        assert_eq!(batch.total_count, 5);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].name, "Pear");
    }

    #[test]
    fn test_short_row_is_rejected_not_fatal() {
        let batch = parse(
            "name,category,price,create_date\n\
             Apple,Fruit\n\
             Apple,Fruit,1.50,2024-01-01\n",
        );
        assert_eq!(batch.total_count, 2);
        assert_eq!(batch.records.len(), 1);
    }

    #[test]
    fn test_malformed_quoting_is_counted_and_skipped() {
        let batch = parse(
            "name,category,price,create_date\n\
             \"Apple,Fruit,1.50,2024-01-01\n\
             Pear,Fruit,2.00,2024-01-02\n",
        );
        // The unterminated quote poisons the rest of the payload; the read
        // error is counted and nothing after it parses.
        assert!(batch.records.is_empty());
        assert!(batch.total_count >= 1);
    }

    #[test]
    fn test_non_numeric_id_becomes_none() {
        let batch = parse("id,name,category,price,create_date\nabc,Apple,Fruit,1.50,2024-01-01\n");
        assert_eq!(batch.records[0].source_id, None);
    }
}
