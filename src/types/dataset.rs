//! Dataset types
//!
//! Schema and analysis summaries computed from uploaded tabular files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inferred type of a column, named after the pandas dtypes the dashboard expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "int64")]
    Integer,
    #[serde(rename = "float64")]
    Float,
    #[serde(rename = "object")]
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// Schema of a tabular dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Header names in file order
    pub columns: Vec<String>,
    /// `[rows, columns]`, header excluded
    pub shape: [usize; 2],
    /// Inferred type per column
    pub dtypes: BTreeMap<String, ColumnType>,
    /// Numeric columns in file order
    pub numeric_columns: Vec<String>,
    /// Whether the sampled values of each column contained a missing cell
    pub has_missing_values: Vec<bool>,
    /// First rows, as read
    pub preview: Vec<Vec<String>>,
}

impl DatasetSchema {
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.dtypes.get(column).copied()
    }
}

/// Numeric vs categorical split of the feature columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTypes {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

/// Target-column analysis of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub total_samples: usize,
    /// Columns other than the target
    pub num_features: usize,
    /// Distinct values in the target column
    pub num_classes: usize,
    /// Percentage of rows per target value, rounded to two decimals
    pub class_distribution: BTreeMap<String, f64>,
    pub feature_types: FeatureTypes,
    /// Missing cells per column
    pub missing_values: BTreeMap<String, usize>,
    pub target_column: String,
}
