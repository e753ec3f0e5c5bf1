//! Prices Common Library
//!
//! Shared utilities for the Prices API workspace:
//!
//! - **Logging**: tracing subscriber setup configured from the environment
//! - **Price**: canonical fixed-point price parsing
//!
//! # Example
//!
//! ```no_run
//! use prices_common::price::canonicalize;
//!
//! let price = canonicalize("5.5").unwrap();
//! assert_eq!(price.cents, 550);
//! assert_eq!(price.text, "5.50");
//! ```

pub mod logging;
pub mod price;

// Re-export commonly used types
pub use price::{canonicalize, CanonicalPrice, PriceParseError};
