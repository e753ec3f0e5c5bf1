//! Archive handling and CSV record parsing for price imports

pub mod archive;
pub mod parser;

pub use archive::{extract_csv, ArchiveError, ArchiveKind};
pub use parser::{parse_records, CsvImportError, ParsedBatch};
