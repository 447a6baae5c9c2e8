//! Data quality scoring
//!
//! All checks run over the full dataset record and its complete resource list.
//! The `sample_size` accepted by callers is not applied here.

use crate::package::{has_text, is_truthy, Package};
use serde::Serialize;
use std::str::FromStr;

/// Fields whose presence makes a dataset "complete"
pub const REQUIRED_FIELDS: [&str; 5] = ["title", "notes", "tags", "organization", "resources"];

/// Resource formats accepted by the format check (compared upper-cased)
pub const VALID_FORMATS: [&str; 7] = ["CSV", "JSON", "XML", "XLS", "XLSX", "PDF", "TXT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    Completeness,
    FormatValidation,
    SchemaCompliance,
}

impl QualityCheck {
    pub const ALL: [QualityCheck; 3] = [
        QualityCheck::Completeness,
        QualityCheck::FormatValidation,
        QualityCheck::SchemaCompliance,
    ];

    /// Parse a list of check names, silently skipping unknown ones
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<QualityCheck> {
        names
            .iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect()
    }
}

impl FromStr for QualityCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completeness" => Ok(QualityCheck::Completeness),
            "format_validation" => Ok(QualityCheck::FormatValidation),
            "schema_compliance" => Ok(QualityCheck::SchemaCompliance),
            other => Err(format!("Unknown quality check: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CompletenessCheck {
    pub score: f64,
    pub required_fields: Vec<String>,
    pub present_fields: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FormatCheck {
    pub score: f64,
    pub resource_count: usize,
    pub valid_formats: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SchemaCheck {
    pub score: f64,
    pub has_license: bool,
    pub has_author: bool,
    pub has_maintainer: bool,
    pub has_temporal_coverage: bool,
    pub has_spatial_coverage: bool,
}

/// Results keyed by check name; only requested checks are present
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct QualityChecks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness: Option<CompletenessCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_validation: Option<FormatCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_compliance: Option<SchemaCheck>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct QualityReport {
    pub dataset_id: String,
    pub dataset_name: Option<String>,
    pub timestamp: String,
    pub checks: QualityChecks,
    pub overall_score: f64,
}

/// Arithmetic mean, `0.0` for an empty slice
fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn ratio_score(hits: usize, total: usize) -> f64 {
    hits as f64 / total as f64 * 100.0
}

pub fn check_completeness(package: &Package) -> CompletenessCheck {
    let present = [
        has_text(&package.title),
        has_text(&package.notes),
        !package.tags.is_empty(),
        package.organization.as_ref().is_some_and(|o| o.is_present()),
        !package.resources.is_empty(),
    ];
    let present_fields = present.iter().filter(|p| **p).count();

    CompletenessCheck {
        score: ratio_score(present_fields, REQUIRED_FIELDS.len()),
        required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        present_fields,
    }
}

pub fn check_formats(package: &Package) -> FormatCheck {
    let scores: Vec<f64> = package
        .resources
        .iter()
        .map(|resource| {
            let format = resource.format.as_deref().unwrap_or("").to_uppercase();
            let valid = VALID_FORMATS.contains(&format.as_str());
            if valid && has_text(&resource.url) {
                100.0
            } else {
                0.0
            }
        })
        .collect();

    FormatCheck {
        score: mean(&scores),
        resource_count: package.resources.len(),
        valid_formats: VALID_FORMATS.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn check_schema(package: &Package) -> SchemaCheck {
    let truthy = |v: &Option<serde_json::Value>| v.as_ref().is_some_and(is_truthy);

    let has_license = has_text(&package.license_id);
    let has_author = has_text(&package.author) || has_text(&package.author_email);
    let has_maintainer = has_text(&package.maintainer) || has_text(&package.maintainer_email);
    let has_temporal_coverage =
        truthy(&package.temporal_coverage_from) || truthy(&package.temporal_coverage_to);
    let has_spatial_coverage = truthy(&package.spatial);

    let passed = [
        has_license,
        has_author,
        has_maintainer,
        has_temporal_coverage,
        has_spatial_coverage,
    ]
    .iter()
    .filter(|p| **p)
    .count();

    SchemaCheck {
        score: ratio_score(passed, 5),
        has_license,
        has_author,
        has_maintainer,
        has_temporal_coverage,
        has_spatial_coverage,
    }
}

/// Run the requested checks against a dataset
///
/// `overall_score` is the mean of the requested checks' scores, `0.0` when no
/// known check was requested.
pub fn score_quality(
    dataset_id: &str,
    package: &Package,
    checks: &[QualityCheck],
    timestamp: String,
) -> QualityReport {
    let mut results = QualityChecks::default();
    let mut scores = Vec::new();

    if checks.contains(&QualityCheck::Completeness) {
        let check = check_completeness(package);
        scores.push(check.score);
        results.completeness = Some(check);
    }

    if checks.contains(&QualityCheck::FormatValidation) {
        let check = check_formats(package);
        scores.push(check.score);
        results.format_validation = Some(check);
    }

    if checks.contains(&QualityCheck::SchemaCompliance) {
        let check = check_schema(package);
        scores.push(check.score);
        results.schema_compliance = Some(check);
    }

    QualityReport {
        dataset_id: dataset_id.to_string(),
        dataset_name: package.name.clone(),
        timestamp,
        checks: results,
        overall_score: mean(&scores),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn package(value: serde_json::Value) -> Package {
        Package::from_value(&value).unwrap()
    }

    fn ts() -> String {
        "2024-01-01T00:00:00.000000".to_string()
    }

    #[test]
    fn test_completeness_title_and_resources_only() {
        let dataset = package(json!({
            "name": "partial",
            "title": "Partial dataset",
            "notes": "",
            "tags": [],
            "resources": [{"format": "CSV", "url": "https://example.com/a.csv"}]
        }));

        let report = score_quality("partial", &dataset, &[QualityCheck::Completeness], ts());
        let completeness = report.checks.completeness.unwrap();

        assert_eq!(completeness.present_fields, 2);
        assert_eq!(completeness.score, 40.0);
        assert_eq!(report.overall_score, 40.0);
        assert!(report.checks.format_validation.is_none());
    }

    #[test]
    fn test_organization_counts_when_non_empty() {
        let completeness_of = |organization: serde_json::Value| {
            let dataset = package(json!({"name": "org", "organization": organization}));
            score_quality("org", &dataset, &[QualityCheck::Completeness], ts())
                .checks
                .completeness
                .unwrap()
                .present_fields
        };

        assert_eq!(completeness_of(json!({"description": "Roads department"})), 1);
        assert_eq!(completeness_of(json!({"id": null})), 1);
        assert_eq!(completeness_of(json!({})), 0);
        assert_eq!(completeness_of(json!(null)), 0);
    }

    #[test]
    fn test_format_validation_without_resources_scores_zero() {
        let dataset = package(json!({"name": "empty", "resources": []}));

        let report = score_quality("empty", &dataset, &[QualityCheck::FormatValidation], ts());
        let formats = report.checks.format_validation.unwrap();

        assert_eq!(formats.score, 0.0);
        assert_eq!(formats.resource_count, 0);
        assert!(!report.overall_score.is_nan());
    }

    #[test]
    fn test_format_validation_mixed_resources() {
        let dataset = package(json!({
            "resources": [
                {"format": "csv", "url": "https://example.com/a.csv"},
                {"format": "SHP", "url": "https://example.com/a.shp"},
                {"format": "JSON", "url": ""},
                {"format": "xlsx", "url": "https://example.com/a.xlsx"}
            ]
        }));

        let formats = check_formats(&dataset);
        assert_eq!(formats.score, 50.0);
        assert_eq!(formats.resource_count, 4);
    }

    #[test]
    fn test_schema_compliance() {
        let dataset = package(json!({
            "license_id": "cc-by",
            "author_email": "a@example.com",
            "maintainer": null,
            "temporal_coverage_to": "2020",
            "spatial": ""
        }));

        let schema = check_schema(&dataset);
        assert!(schema.has_license);
        assert!(schema.has_author);
        assert!(!schema.has_maintainer);
        assert!(schema.has_temporal_coverage);
        assert!(!schema.has_spatial_coverage);
        assert_eq!(schema.score, 60.0);
    }

    #[test]
    fn test_overall_is_mean_of_requested_checks() {
        let dataset = package(json!({
            "name": "full",
            "title": "t",
            "notes": "n",
            "tags": [{"name": "x"}],
            "organization": {"id": "o"},
            "resources": [{"format": "PDF", "url": "u"}]
        }));

        let report = score_quality("full", &dataset, &QualityCheck::ALL, ts());

        // completeness 100, formats 100, schema 0
        let expected = (100.0 + 100.0 + 0.0) / 3.0;
        assert!((report.overall_score - expected).abs() < 1e-9);
        assert_eq!(report.dataset_name.as_deref(), Some("full"));
    }

    #[test]
    fn test_no_checks_requested() {
        let report = score_quality("x", &Package::default(), &[], ts());
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.checks, QualityChecks::default());
    }

    #[test]
    fn test_parse_list_skips_unknown_names() {
        let checks = QualityCheck::parse_list(&["completeness", "bogus", "schema_compliance"]);
        assert_eq!(
            checks,
            vec![QualityCheck::Completeness, QualityCheck::SchemaCompliance]
        );
    }

    #[test]
    fn test_report_serialization_only_includes_requested_checks() {
        let report = score_quality("x", &Package::default(), &[QualityCheck::Completeness], ts());
        let value = serde_json::to_value(&report).unwrap();

        assert!(value["checks"].get("completeness").is_some());
        assert!(value["checks"].get("format_validation").is_none());
        assert_eq!(value["checks"]["completeness"]["score"], json!(0.0));
    }
}
