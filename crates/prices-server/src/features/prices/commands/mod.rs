pub mod import;

pub use import::{ImportPricesCommand, ImportPricesError};
