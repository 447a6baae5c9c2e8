//! Usage analytics and portal statistics
//!
//! Two disjoint report shapes: a site-wide one for the subject `"all"` and a
//! per-dataset one built from a single `package_show` result.

use crate::package::{Package, PackageSearchResult};
use crate::query::{QueryParams, MATCH_ALL};
use serde::Serialize;
use serde_json::{json, Value};

/// Subject that selects the site-wide report
pub const ALL_DATASETS: &str = "all";

/// Metrics requested when the caller does not name any
///
/// `api_calls` is accepted but never populated.
pub const DEFAULT_METRICS: [&str; 4] = ["views", "downloads", "api_calls", "resource_count"];

/// Number of "popular" datasets reported in the site-wide report
pub const POPULAR_LIMIT: usize = 5;

/// Rows fetched by the recency and popularity searches
const RANKING_ROWS: usize = 10;

pub fn default_time_range() -> Value {
    json!({"start": "30_days_ago", "end": "now"})
}

/// `package_search` parameters for the most recently created datasets
pub fn recent_search_params() -> QueryParams {
    QueryParams::new()
        .with("q", MATCH_ALL)
        .with("sort", "metadata_created desc")
        .with("rows", RANKING_ROWS)
}

/// `package_search` parameters for datasets with the most resources
pub fn popular_search_params() -> QueryParams {
    QueryParams::new()
        .with("q", MATCH_ALL)
        .with("sort", "num_resources desc")
        .with("rows", RANKING_ROWS)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PopularDataset {
    pub id: Option<String>,
    pub name: Option<String>,
    pub resources: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SiteMetrics {
    pub total_datasets: usize,
    pub site_status: Value,
    pub recent_datasets: u64,
    pub popular_datasets: Vec<PopularDataset>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DatasetMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub tags_count: usize,
    pub organization: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnalyticsMetrics {
    Site(SiteMetrics),
    Dataset(DatasetMetrics),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnalyticsReport {
    pub dataset_id: String,
    pub time_range: Value,
    pub metrics: AnalyticsMetrics,
}

/// Build the site-wide report
///
/// # Arguments
/// * `package_list` - result of `package_list` (an array of names)
/// * `site_status` - result of `status_show`, passed through untouched
/// * `recent` - result of the recency-sorted search
/// * `popular` - result of the resource-count-sorted search
pub fn site_analytics(
    time_range: Option<Value>,
    package_list: &Value,
    site_status: Value,
    recent: &PackageSearchResult,
    popular: &PackageSearchResult,
) -> AnalyticsReport {
    let popular_datasets = popular
        .results
        .iter()
        .take(POPULAR_LIMIT)
        .map(|ds| PopularDataset {
            id: ds.get("id").and_then(Value::as_str).map(String::from),
            name: ds.get("name").and_then(Value::as_str).map(String::from),
            resources: ds.get("num_resources").and_then(Value::as_u64).unwrap_or(0),
        })
        .collect();

    AnalyticsReport {
        dataset_id: ALL_DATASETS.to_string(),
        time_range: time_range.unwrap_or_else(default_time_range),
        metrics: AnalyticsMetrics::Site(SiteMetrics {
            total_datasets: package_list.as_array().map_or(0, Vec::len),
            site_status,
            recent_datasets: recent.count,
            popular_datasets,
        }),
    }
}

/// Build the per-dataset report
///
/// Only `resource_count`, `views` and `downloads` depend on `metrics`; views
/// and downloads are read from the tracking summary and omitted without one.
pub fn dataset_analytics<S: AsRef<str>>(
    dataset_id: &str,
    time_range: Option<Value>,
    package: &Package,
    metrics: &[S],
) -> AnalyticsReport {
    let wants = |name: &str| metrics.iter().any(|m| m.as_ref() == name);
    let tracking = package.tracking_summary.as_ref();

    let metrics = DatasetMetrics {
        resource_count: wants("resource_count").then(|| package.resources.len()),
        views: tracking
            .filter(|_| wants("views"))
            .and_then(|t| t.total),
        downloads: tracking
            .filter(|_| wants("downloads"))
            .and_then(|t| t.recent),
        created: package.metadata_created.clone(),
        modified: package.metadata_modified.clone(),
        tags_count: package.tags.len(),
        organization: package.organization_name().map(String::from),
    };

    AnalyticsReport {
        dataset_id: dataset_id.to_string(),
        time_range: time_range.unwrap_or_else(default_time_range),
        metrics: AnalyticsMetrics::Dataset(metrics),
    }
}

/// Portal-wide counters shown by the explorer's `stats` command
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PortalStatistics {
    pub total_packages: u64,
    pub total_organizations: usize,
    pub total_tags: usize,
    pub ckan_version: String,
}

pub fn portal_statistics(
    search: &PackageSearchResult,
    organizations: &Value,
    tags: &Value,
    status: &Value,
) -> PortalStatistics {
    PortalStatistics {
        total_packages: search.count,
        total_organizations: organizations.as_array().map_or(0, Vec::len),
        total_tags: tags.as_array().map_or(0, Vec::len),
        ckan_version: status
            .get("ckan_version")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
    }
}
