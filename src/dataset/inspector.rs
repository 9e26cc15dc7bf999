//! Dataset schema inspection
//!
//! Column types come from a bounded sample of rows; the row count covers the
//! whole file.

use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::table::open_table;
use crate::dataset::ParseError;
use crate::types::dataset::{ColumnType, DatasetSchema};

pub const DEFAULT_SAMPLE_ROWS: usize = 1000;
pub const PREVIEW_ROWS: usize = 5;

/// Spellings treated as a missing cell
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

pub(crate) fn is_missing(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// Running type inference for one column
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ColumnProfile {
    inferred: Option<ColumnType>,
    pub missing: usize,
}

impl ColumnProfile {
    pub fn observe(&mut self, value: &str) {
        if is_missing(value) {
            self.missing += 1;
            return;
        }

        let value = value.trim();
        let kind = if value.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if value.parse::<f64>().is_ok() {
            ColumnType::Float
        } else {
            ColumnType::Text
        };

        self.inferred = Some(match (self.inferred, kind) {
            (None, k) => k,
            (Some(ColumnType::Text), _) | (_, ColumnType::Text) => ColumnType::Text,
            (Some(ColumnType::Float), _) | (_, ColumnType::Float) => ColumnType::Float,
            (Some(ColumnType::Integer), ColumnType::Integer) => ColumnType::Integer,
        });
    }

    /// All-missing columns are reported as float, like a column of NaN
    pub fn column_type(&self) -> ColumnType {
        self.inferred.unwrap_or(ColumnType::Float)
    }
}

/// Inspect a dataset with the default sample size
pub fn inspect(path: &Path) -> Result<DatasetSchema, ParseError> {
    inspect_with(path, DEFAULT_SAMPLE_ROWS)
}

/// Inspect a dataset, inferring types from the first `sample_rows` rows
pub fn inspect_with(path: &Path, sample_rows: usize) -> Result<DatasetSchema, ParseError> {
    let table = open_table(path)?;
    let columns = table.headers;
    let mut profiles = vec![ColumnProfile::default(); columns.len()];
    let mut preview = Vec::with_capacity(PREVIEW_ROWS);
    let mut row_count = 0usize;

    for row in table.rows {
        let row = row?;
        if row_count < sample_rows {
            for (profile, value) in profiles.iter_mut().zip(row.iter()) {
                profile.observe(value);
            }
        }
        if preview.len() < PREVIEW_ROWS {
            preview.push(row);
        }
        row_count += 1;
    }

    let mut dtypes = BTreeMap::new();
    let mut numeric_columns = Vec::new();
    for (name, profile) in columns.iter().zip(profiles.iter()) {
        let column_type = profile.column_type();
        if column_type.is_numeric() {
            numeric_columns.push(name.clone());
        }
        dtypes.insert(name.clone(), column_type);
    }

    tracing::debug!(
        "Inspected {}: {} rows x {} columns",
        path.display(),
        row_count,
        columns.len()
    );

    Ok(DatasetSchema {
        shape: [row_count, columns.len()],
        has_missing_values: profiles.iter().map(|p| p.missing > 0).collect(),
        columns,
        dtypes,
        numeric_columns,
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::path::PathBuf;

    fn write_iris(dir: &Path) -> PathBuf {
        let species = ["setosa", "versicolor", "virginica"];
        let mut csv = String::from("sepal_length,sepal_width,petal_length,petal_width,species\n");
        for i in 0..150 {
            let base = 4.3 + (i % 36) as f64 * 0.1;
            writeln!(
                csv,
                "{:.1},{:.1},{:.1},{:.1},{}",
                base,
                base * 0.6,
                base * 0.7,
                base * 0.2,
                species[i / 50]
            )
            .unwrap();
        }
        let path = dir.join("iris.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    #[test]
    fn test_iris_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = inspect(&write_iris(dir.path())).unwrap();

        assert_eq!(
            schema.columns,
            ["sepal_length", "sepal_width", "petal_length", "petal_width", "species"]
        );
        assert_eq!(schema.shape, [150, 5]);
        assert_eq!(schema.numeric_columns.len(), 4);
        assert!(!schema.numeric_columns.contains(&"species".to_string()));
        assert_eq!(schema.column_type("species"), Some(ColumnType::Text));
        assert_eq!(schema.column_type("sepal_length"), Some(ColumnType::Float));
        assert_eq!(schema.preview.len(), PREVIEW_ROWS);
        assert!(schema.has_missing_values.iter().all(|m| !m));
    }

    #[test]
    fn test_type_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.csv");
        std::fs::write(
            &path,
            "count,ratio,label,empty,mixed\n1,0.5,a,,1\n2,1,b,NA,x\n,2.5,c,,3\n",
        )
        .unwrap();

        let schema = inspect(&path).unwrap();
        assert_eq!(schema.column_type("count"), Some(ColumnType::Integer));
        assert_eq!(schema.column_type("ratio"), Some(ColumnType::Float));
        assert_eq!(schema.column_type("label"), Some(ColumnType::Text));
        assert_eq!(schema.column_type("empty"), Some(ColumnType::Float));
        assert_eq!(schema.column_type("mixed"), Some(ColumnType::Text));
        assert_eq!(schema.has_missing_values, [true, false, false, true, false]);
        assert_eq!(schema.shape, [3, 5]);
    }

    #[test]
    fn test_sample_bounds_type_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late_text.csv");
        let mut csv = String::from("v\n");
        for i in 0..20 {
            writeln!(csv, "{}", i).unwrap();
        }
        csv.push_str("oops\n");
        std::fs::write(&path, csv).unwrap();

        let sampled = inspect_with(&path, 10).unwrap();
        assert_eq!(sampled.column_type("v"), Some(ColumnType::Integer));
        assert_eq!(sampled.shape, [21, 1]);

        let full = inspect_with(&path, 100).unwrap();
        assert_eq!(full.column_type("v"), Some(ColumnType::Text));
    }

    #[test]
    fn test_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.csv");
        std::fs::write(&path, "a,b\n").unwrap();
        let schema = inspect(&path).unwrap();
        assert_eq!(schema.shape, [0, 2]);
        assert!(schema.preview.is_empty());
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(" "));
        assert!(is_missing("NaN"));
        assert!(!is_missing("0"));
    }
}
