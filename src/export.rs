//! Write comparison results to disk.
//!
//! Every non-empty partition becomes one file (`value_differences_<ts>.<ext>`,
//! `left_only_records_<ts>.<ext>`, `right_only_records_<ts>.<ext>`), and the summary is always
//! written as `comparison_summary_<ts>.json`. `<ts>` is the local time formatted as
//! `%Y%m%d_%H%M%S`.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use polars::prelude::{CsvWriter, DataFrame, JsonFormat, JsonWriter, ParquetWriter, SerWriter};

use crate::error::{CompareError, CompareResult};
use crate::pipeline::{ComparisonResults, PartitionKind};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Output format for partition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    #[default]
    Parquet,
    /// Newline-delimited JSON, written with a `.json` extension.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            "json" => Ok(Self::Json),
            other => Err(CompareError::UnsupportedFormat {
                message: format!("unknown export format '{other}' (expected csv, parquet or json)"),
            }),
        }
    }
}

/// Paths written by [`export_results`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportedFiles {
    pub value_differences: Option<PathBuf>,
    pub left_only: Option<PathBuf>,
    pub right_only: Option<PathBuf>,
    pub summary: PathBuf,
}

impl ExportedFiles {
    /// Every written path, summary last.
    pub fn paths(&self) -> Vec<&Path> {
        [&self.value_differences, &self.left_only, &self.right_only]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.summary.as_path()))
            .collect()
    }
}

/// Write `results` into `output_dir`, creating the directory if needed.
pub fn export_results(
    results: &ComparisonResults,
    format: ExportFormat,
    output_dir: impl AsRef<Path>,
) -> CompareResult<ExportedFiles> {
    let dir = output_dir.as_ref();
    fs::create_dir_all(dir)?;
    let ts = Local::now().format(TIMESTAMP_FORMAT).to_string();

    let mut files = ExportedFiles::default();
    for partition in results.partitions() {
        if partition.is_empty() {
            continue;
        }
        let kind = partition.kind();
        let path = dir.join(format!("{}_{ts}.{}", kind.file_stem(), format.extension()));
        let mut df = partition.collect()?;
        write_frame(&mut df, format, &path)?;
        let slot = match kind {
            PartitionKind::ValueDifferences => &mut files.value_differences,
            PartitionKind::LeftOnly => &mut files.left_only,
            PartitionKind::RightOnly => &mut files.right_only,
        };
        *slot = Some(path);
    }

    files.summary = dir.join(format!("comparison_summary_{ts}.json"));
    fs::write(&files.summary, serde_json::to_string_pretty(&results.summary)?)?;
    Ok(files)
}

fn write_frame(df: &mut DataFrame, format: ExportFormat, path: &Path) -> CompareResult<()> {
    let file = File::create(path)?;
    match format {
        ExportFormat::Csv => CsvWriter::new(file).include_header(true).finish(df)?,
        ExportFormat::Parquet => {
            ParquetWriter::new(file).finish(df)?;
        }
        ExportFormat::Json => JsonWriter::new(file)
            .with_json_format(JsonFormat::JsonLines)
            .finish(df)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ExportFormat;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("Parquet".parse::<ExportFormat>().unwrap(), ExportFormat::Parquet);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn default_is_parquet() {
        assert_eq!(ExportFormat::default().extension(), "parquet");
    }
}
