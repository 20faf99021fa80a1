//! CSV adapters at the edge of the pipeline.
//!
//! Stages hand tables to each other only through these files: each stage reads
//! the previous stage's CSV and writes its own once all of its work succeeded.

use crate::error::{PipelineError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load a comma-delimited CSV with a header row.
///
/// Fails with [`PipelineError::MissingFile`] carrying the attempted path when
/// the file does not exist. Schema inference scans the whole file so that
/// late float values do not break integer-looking columns.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PipelineError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    debug!("Loading CSV: {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Reading {}", path.display()))?;

    info!("Loaded {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// A completely written temporary file waiting to replace its target.
///
/// Dropping it without [`StagedFile::commit`] deletes the temporary file, so
/// an error anywhere before the commit leaves the output directory untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn new(target: &Path) -> Result<Self> {
        ensure_parent_dir(target)?;
        Ok(Self {
            tmp_path: temporary_sibling(target),
            target: target.to_path_buf(),
            committed: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temporary file over the target.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp_path, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed
            && self.tmp_path.exists()
            && let Err(e) = fs::remove_file(&self.tmp_path)
        {
            warn!("Could not remove {}: {}", self.tmp_path.display(), e);
        }
    }
}

/// Write a DataFrame as CSV to a temporary sibling of `path`.
pub fn stage_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<StagedFile> {
    let path = path.as_ref();
    let staged = StagedFile::new(path)?;

    let mut file = File::create(&staged.tmp_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Writing {}", path.display()))?;

    Ok(staged)
}

/// Serialize a value as pretty JSON to a temporary sibling of `path`.
pub fn stage_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<StagedFile> {
    let path = path.as_ref();
    let staged = StagedFile::new(path)?;

    let file = File::create(&staged.tmp_path)?;
    serde_json::to_writer_pretty(file, value)?;

    Ok(staged)
}

/// Write a DataFrame as CSV with a header row.
///
/// The table is written to a sibling temporary file and renamed into place,
/// so a failed write never leaves a truncated output behind.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    stage_csv(df, path)?.commit()?;
    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Serialize a value as pretty JSON to `path`.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    stage_json(value, path)?.commit()?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
        debug!("Created output directory: {}", parent.display());
    }
    Ok(())
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "return-risk-io-{}-{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_csv_missing_file() {
        let path = scratch_dir("missing").join("does_not_exist.csv");
        let err = load_csv(&path).unwrap_err();

        match err {
            PipelineError::MissingFile { path: attempted } => assert_eq!(attempted, path),
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn test_write_then_load_csv() {
        let path = scratch_dir("roundtrip").join("nested/table.csv");
        let mut df = df![
            "order_id" => ["a", "b", "c"],
            "price" => [10.5, 20.0, 3.25],
        ]
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let loaded = load_csv(&path).unwrap();

        assert_eq!(loaded.shape(), (3, 2));
        assert!(!temporary_sibling(&path).exists());
        let prices: Vec<Option<f64>> = loaded
            .column("price")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(prices, vec![Some(10.5), Some(20.0), Some(3.25)]);
    }

    #[test]
    fn test_failed_csv_write_removes_temporary_file() {
        let path = scratch_dir("failed-csv").join("table.csv");
        let nested = Series::new(
            "values".into(),
            [Series::new("".into(), [1i64, 2]), Series::new("".into(), [3i64])],
        );
        let mut df = DataFrame::new(vec![nested.into()]).unwrap();

        assert!(write_csv(&mut df, &path).is_err());
        assert!(!temporary_sibling(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_json_write_removes_temporary_file() {
        let path = scratch_dir("failed-json").join("report.json");
        // non-string map keys cannot be written as JSON
        let value: std::collections::BTreeMap<(i32, i32), i32> = [((1, 2), 3)].into();

        assert!(write_json(&value, &path).is_err());
        assert!(!temporary_sibling(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_uncommitted_stage_leaves_no_output() {
        let dir = scratch_dir("uncommitted");
        let path = dir.join("table.csv");
        let mut df = df!["x" => [1i64, 2]].unwrap();

        let staged = stage_csv(&mut df, &path).unwrap();
        assert_eq!(staged.target(), path.as_path());
        assert!(temporary_sibling(&path).exists());
        drop(staged);

        assert!(!temporary_sibling(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_json() {
        let path = scratch_dir("json").join("report.json");
        write_json(&serde_json::json!({ "rows": 3 }), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"rows\": 3"));
    }
}
