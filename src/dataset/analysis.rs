//! Target-column analysis
//!
//! Full scan of a dataset summarizing the class balance of the chosen target
//! and the shape of the remaining features.

use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::inspector::{is_missing, ColumnProfile};
use crate::dataset::table::open_table;
use crate::dataset::ParseError;
use crate::types::dataset::{DatasetAnalysis, FeatureTypes};

/// Analyze `target` over every row of the dataset at `path`
///
/// Missing target values count towards `total_samples` but not towards the
/// class distribution.
pub fn analyze(path: &Path, target: &str) -> Result<DatasetAnalysis, ParseError> {
    let table = open_table(path)?;
    let target_idx = table.column_index(target)?;
    let headers = table.headers;

    let mut profiles = vec![ColumnProfile::default(); headers.len()];
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_samples = 0usize;

    for row in table.rows {
        let row = row?;
        for (profile, value) in profiles.iter_mut().zip(row.iter()) {
            profile.observe(value);
        }
        if let Some(value) = row.get(target_idx) {
            if !is_missing(value) {
                *class_counts.entry(value.trim().to_string()).or_default() += 1;
            }
        }
        total_samples += 1;
    }

    let labelled: usize = class_counts.values().sum();
    let class_distribution = class_counts
        .iter()
        .map(|(class, count)| (class.clone(), round2(*count as f64 * 100.0 / labelled as f64)))
        .collect();

    let mut feature_types = FeatureTypes::default();
    let mut missing_values = BTreeMap::new();
    for (idx, (name, profile)) in headers.iter().zip(profiles.iter()).enumerate() {
        missing_values.insert(name.clone(), profile.missing);
        if idx == target_idx {
            continue;
        }
        if profile.column_type().is_numeric() {
            feature_types.numeric.push(name.clone());
        } else {
            feature_types.categorical.push(name.clone());
        }
    }

    tracing::debug!(
        "Analyzed {} on target '{}': {} samples, {} classes",
        path.display(),
        target,
        total_samples,
        class_counts.len()
    );

    Ok(DatasetAnalysis {
        total_samples,
        num_features: headers.len() - 1,
        num_classes: class_counts.len(),
        class_distribution,
        feature_types,
        missing_values,
        target_column: target.to_string(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("data.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_class_distribution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "age,city,label\n31,paris,yes\n45,lyon,no\n22,,yes\n,paris,NA\n",
        );

        let analysis = analyze(&path, "label").unwrap();
        assert_eq!(analysis.total_samples, 4);
        assert_eq!(analysis.num_features, 2);
        assert_eq!(analysis.num_classes, 2);
        assert_eq!(analysis.class_distribution["yes"], 66.67);
        assert_eq!(analysis.class_distribution["no"], 33.33);
        assert_eq!(analysis.feature_types.numeric, ["age"]);
        assert_eq!(analysis.feature_types.categorical, ["city"]);
        assert_eq!(analysis.missing_values["age"], 1);
        assert_eq!(analysis.missing_values["city"], 1);
        assert_eq!(analysis.missing_values["label"], 1);

        let total: f64 = analysis.class_distribution.values().sum();
        assert!((total - 100.0).abs() < 0.05);
    }

    #[test]
    fn test_unknown_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a,b\n1,2\n");
        let err = analyze(&path, "species").unwrap_err();
        assert!(matches!(err, ParseError::UnknownColumn { ref column, .. } if column == "species"));
    }

    #[test]
    fn test_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x,y\n");
        let analysis = analyze(&path, "y").unwrap();
        assert_eq!(analysis.total_samples, 0);
        assert_eq!(analysis.num_classes, 0);
        assert!(analysis.class_distribution.is_empty());
    }
}
