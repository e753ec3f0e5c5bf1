//! Archive dispatch for uploaded price data
//!
//! An upload is a zip archive or a tar archive (optionally gzip-compressed)
//! containing exactly one CSV payload of interest. The dispatcher locates the
//! first `.csv` entry (case-insensitive, directories skipped) and returns its
//! bytes; remaining entries are ignored.
//!
//! Gzip detection is transparent: a `tar` upload whose first two bytes match
//! the gzip magic number is decompressed before the tar scan, so `.tar.gz`
//! and plain `.tar` are the same caller-declared kind.

use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use thiserror::Error;
use tracing::debug;

/// Caller-declared archive container format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
}

impl ArchiveKind {
    /// Parse the `type` query parameter. `None` defaults to zip; anything
    /// other than the two literals is a caller error.
    pub fn from_param(param: Option<&str>) -> Result<Self, UnknownArchiveKind> {
        match param.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("zip") => Ok(ArchiveKind::Zip),
            Some("tar") => Ok(ArchiveKind::Tar),
            Some(other) => Err(UnknownArchiveKind(other.to_string())),
        }
    }
}

/// Rejected `type` query parameter value
#[derive(Error, Debug)]
#[error("query param 'type' must be 'zip' or 'tar', got '{0}'")]
pub struct UnknownArchiveKind(pub String);

/// Errors from locating the CSV payload inside an upload
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive cannot be opened: {0}")]
    Corrupt(String),

    #[error("no .csv file found in archive")]
    CsvNotFound,

    #[error("failed to read archive entry: {0}")]
    Read(#[from] std::io::Error),
}

/// Locate the single CSV payload in an uploaded archive and return its bytes.
pub fn extract_csv(data: &[u8], kind: ArchiveKind) -> Result<Vec<u8>, ArchiveError> {
    match kind {
        ArchiveKind::Zip => extract_csv_from_zip(data),
        ArchiveKind::Tar => extract_csv_from_tar(data),
    }
}

fn is_csv_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

fn extract_csv_from_zip(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let cursor = Cursor::new(data);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        if file.is_dir() || !is_csv_name(file.name()) {
            continue;
        }

        debug!(entry = %file.name(), "Found CSV entry in zip archive");
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        return Ok(contents);
    }

    Err(ArchiveError::CsvNotFound)
}

fn extract_csv_from_tar(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    // Gzip magic number sniff; a match means .tar.gz, anything else is
    // treated as a plain tar stream.
    let plain = if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ArchiveError::Corrupt(format!("gzip: {}", e)))?;
        debug!(
            compressed = data.len(),
            decompressed = decompressed.len(),
            "Decompressed gzip tar upload"
        );
        decompressed
    } else {
        data.to_vec()
    };

    let mut archive = tar::Archive::new(Cursor::new(plain));
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        if entry.header().entry_type().is_dir() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?
            .to_string_lossy()
            .to_string();

        if !is_csv_name(&path) {
            continue;
        }

        debug!(entry = %path, "Found CSV entry in tar archive");
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        return Ok(contents);
    }

    Err(ArchiveError::CsvNotFound)
}
