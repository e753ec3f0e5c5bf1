//! Shared types for the prices feature

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated price record in canonical form.
///
/// `price_decimal` is always derived from `price_cents` and is the only
/// price representation sent to storage or emitted on export. The uniqueness
/// identity of a record is (name, category, price_decimal, create_date);
/// `source_id` is carried from the CSV `id` column when present but never
/// participates in identity or storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub price_decimal: String,
    pub create_date: NaiveDate,
    pub source_id: Option<i64>,
}

/// Aggregate counters returned from one import call.
///
/// `total_categories` and `total_price` are global aggregates over all stored
/// records after the import committed, not batch-scoped values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub total_count: i64,
    pub duplicates_count: i64,
    pub total_items: i64,
    pub total_categories: i64,
    /// JSON integer when the stored sum has no fractional cents, otherwise a
    /// decimal number.
    pub total_price: serde_json::Value,
}

/// Render the `SUM(price)::text` aggregate as an integer-or-decimal JSON
/// number.
pub fn total_price_value(sum_text: &str) -> serde_json::Value {
    let sum_text = sum_text.trim();

    if let Some(whole) = sum_text.strip_suffix(".00") {
        if let Ok(n) = whole.parse::<i64>() {
            return serde_json::Value::from(n);
        }
    }

    if let Ok(f) = sum_text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return serde_json::Value::Number(n);
        }
    }

    serde_json::Value::from(0)
}

/// Validated export filters. Absent bounds are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Filter parsing and cross-field validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid start (expected YYYY-MM-DD)")]
    InvalidStart,

    #[error("invalid end (expected YYYY-MM-DD)")]
    InvalidEnd,

    #[error("start must be <= end")]
    StartAfterEnd,

    #[error("invalid min (expected natural number > 0)")]
    InvalidMin,

    #[error("invalid max (expected natural number > 0)")]
    InvalidMax,

    #[error("min must be <= max")]
    MinAboveMax,
}

impl ExportFilters {
    /// Build filters from raw query-string values, applying the strict date
    /// grammar and positivity rules before any cross-field checks.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
        min: Option<&str>,
        max: Option<&str>,
    ) -> Result<Self, FilterError> {
        let parse_date = |s: &str, err: FilterError| {
            if s.len() != 10 {
                return Err(err);
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| err)
        };
        let parse_bound = |s: &str, err: FilterError| match s.parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(err),
        };

        let filters = Self {
            start: start
                .filter(|s| !s.is_empty())
                .map(|s| parse_date(s, FilterError::InvalidStart))
                .transpose()?,
            end: end
                .filter(|s| !s.is_empty())
                .map(|s| parse_date(s, FilterError::InvalidEnd))
                .transpose()?,
            min: min
                .filter(|s| !s.is_empty())
                .map(|s| parse_bound(s, FilterError::InvalidMin))
                .transpose()?,
            max: max
                .filter(|s| !s.is_empty())
                .map(|s| parse_bound(s, FilterError::InvalidMax))
                .transpose()?,
        };

        filters.validate()?;
        Ok(filters)
    }

    /// Cross-field ordering checks.
    pub fn validate(&self) -> Result<(), FilterError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(FilterError::StartAfterEnd);
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(FilterError::MinAboveMax);
            }
        }
        Ok(())
    }
}

/// Raw export query parameters as received from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

impl TryFrom<ExportParams> for ExportFilters {
    type Error = FilterError;

    fn try_from(params: ExportParams) -> Result<Self, FilterError> {
        ExportFilters::from_params(
            params.start.as_deref(),
            params.end.as_deref(),
            params.min.as_deref(),
            params.max.as_deref(),
        )
    }
}
