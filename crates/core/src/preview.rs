//! Resource preview extraction
//!
//! A preview combines `resource_show` metadata with a bounded
//! `datastore_search`. Resources without a DataStore table still get a
//! preview, just without rows.

use crate::package::Resource;
use crate::query::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attached when the DataStore query is not available for a resource
pub const DATASTORE_UNAVAILABLE_NOTE: &str = "DataStore not available for this resource";

/// Result of `datastore_search`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatastoreResult {
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub fields: Option<Vec<DatastoreField>>,
}

impl DatastoreResult {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        DatastoreResult::deserialize(value)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatastoreField {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub info: Option<Value>,
}

/// One summary entry per DataStore field
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldStatistic {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub info: Value,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ResourcePreview {
    pub resource_id: String,
    pub resource_name: Option<String>,
    pub format: Option<String>,
    pub url: Option<String>,
    pub size: Option<Value>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub preview_data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_statistics: Option<Vec<FieldStatistic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// `datastore_search` parameters for the first `rows` records of a resource
pub fn datastore_search_params(resource_id: &str, rows: usize) -> QueryParams {
    QueryParams::new()
        .with("resource_id", resource_id)
        .with("limit", rows)
}

/// Assemble a preview
///
/// `datastore` is `None` when the DataStore query failed; the preview then
/// carries no rows and an explanatory note instead of an error.
pub fn build_preview(
    resource_id: &str,
    resource: &Resource,
    datastore: Option<DatastoreResult>,
    generate_stats: bool,
) -> ResourcePreview {
    let mut preview = ResourcePreview {
        resource_id: resource_id.to_string(),
        resource_name: resource.name.clone(),
        format: resource.format.clone(),
        url: resource.url.clone(),
        size: resource.size.clone(),
        created: resource.created.clone(),
        last_modified: resource.last_modified.clone(),
        preview_data: None,
        total_records: None,
        field_statistics: None,
        note: None,
    };

    let Some(datastore) = datastore else {
        preview.note = Some(DATASTORE_UNAVAILABLE_NOTE.to_string());
        return preview;
    };

    preview.preview_data = Some(datastore.records.unwrap_or_default());
    preview.total_records = Some(datastore.total.unwrap_or(0));

    let fields = datastore.fields.unwrap_or_default();
    if generate_stats && !fields.is_empty() {
        preview.field_statistics = Some(
            fields
                .into_iter()
                .map(|field| FieldStatistic {
                    id: field.id,
                    field_type: field.field_type,
                    info: field
                        .info
                        .unwrap_or_else(|| Value::Object(Default::default())),
                })
                .collect(),
        );
    }

    preview
}
