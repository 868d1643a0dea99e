//! Load comparison inputs from files.
//!
//! [`load_lazy`] reads a CSV, JSON/NDJSON or Parquet file into a [`LazyFrame`] ready to hand to
//! [`crate::compare`]. The format is inferred from the file extension unless
//! [`SourceOptions::format`] forces one.

use std::fs::File;
use std::path::Path;

use polars::prelude::{CsvReadOptions, IntoLazy, JsonFormat, JsonReader, LazyFrame, ParquetReader, SerReader};

use crate::error::{CompareError, CompareResult};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// Options for [`load_lazy`].
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// If `None`, the format is inferred from the file extension.
    pub format: Option<SourceFormat>,
    /// Read JSON as newline-delimited. If `None`, `.ndjson`/`.jsonl` files are read as NDJSON and
    /// everything else as a JSON array.
    pub json_lines: Option<bool>,
    /// CSV field separator.
    pub csv_separator: u8,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            format: None,
            json_lines: None,
            csv_separator: b',',
        }
    }
}

impl SourceOptions {
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Read `path` into a [`LazyFrame`].
pub fn load_lazy(path: impl AsRef<Path>, options: &SourceOptions) -> CompareResult<LazyFrame> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str());
    let format = match options.format {
        Some(f) => f,
        None => ext
            .and_then(SourceFormat::from_extension)
            .ok_or_else(|| CompareError::UnsupportedFormat {
                message: format!("cannot infer a source format for '{}'", path.display()),
            })?,
    };

    let df = match format {
        SourceFormat::Csv => {
            let separator = options.csv_separator;
            CsvReadOptions::default()
                .with_has_header(true)
                .map_parse_options(|o| o.with_separator(separator))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        }
        SourceFormat::Json => {
            let lines = options.json_lines.unwrap_or_else(|| {
                matches!(ext.map(str::to_ascii_lowercase).as_deref(), Some("ndjson" | "jsonl"))
            });
            let json_format = if lines { JsonFormat::JsonLines } else { JsonFormat::Json };
            JsonReader::new(File::open(path)?)
                .with_json_format(json_format)
                .finish()?
        }
        SourceFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
    };
    Ok(df.lazy())
}
