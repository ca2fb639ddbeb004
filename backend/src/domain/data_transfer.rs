//! Import and export request shapes.
//!
//! Only JSON export is produced by this service. CSV and Excel are accepted
//! as request values so clients get a precise error instead of a parse
//! failure; file parsing for imports belongs to a separate worker.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{Branch, Counter, FieldErrors, InvalidChoice};

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    #[default]
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "csv" => Ok(Self::Csv),
            "excel" => Ok(Self::Excel),
            "json" => Ok(Self::Json),
            other => Err(InvalidChoice {
                value: other.to_owned(),
            }),
        }
    }
}

/// Export options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub include_inactive: bool,
    pub include_counters: bool,
}

impl ExportRequest {
    /// Parse the optional format text; absent means JSON.
    pub fn new(
        format: Option<&str>,
        include_inactive: bool,
        include_counters: bool,
    ) -> Result<Self, FieldErrors> {
        let format = match format {
            Some(raw) => raw
                .parse()
                .map_err(|err: InvalidChoice| FieldErrors::single("format", err.to_string()))?,
            None => ExportFormat::default(),
        };
        Ok(Self {
            format,
            include_inactive,
            include_counters,
        })
    }
}

/// Exported snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchExport {
    pub exported_at: DateTime<Utc>,
    pub branches: Vec<Branch>,
    pub counters: Option<Vec<Counter>>,
}

/// Uploaded file metadata handed to the import worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

/// Import options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub file: ImportFile,
    pub overwrite: bool,
}

impl ImportRequest {
    /// The file is required and must not be empty.
    pub fn new(file: Option<ImportFile>, overwrite: bool) -> Result<Self, FieldErrors> {
        match file {
            None => Err(FieldErrors::single("file", "no file was submitted")),
            Some(file) if file.size == 0 => {
                Err(FieldErrors::single("file", "the submitted file is empty"))
            }
            Some(file) => Ok(Self { file, overwrite }),
        }
    }
}
