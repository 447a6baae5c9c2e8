use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{JsonRpcError, ServerState};

pub const API_DOCS_URI: &str = "ckan://api/docs";
pub const CONFIG_URI: &str = "ckan://config";
pub const FEATURES_URI: &str = "ckan://enhanced/features";

/// Derived tools advertised by the configuration resource
pub const ENHANCED_FEATURES: [&str; 6] = [
    "faceted_search",
    "related_datasets",
    "data_quality_check",
    "dataset_analytics",
    "resource_preview",
    "metadata_exporter",
];

const API_DOCS: &str = "CKAN API Documentation Summary

Base URL: Configure via CKAN_URL environment variable
API Version: 3

Key Endpoints:
- package_list: Get all packages/datasets
- package_show: Get package details
- package_search: Search packages
- organization_list: Get all organizations
- organization_show: Get organization details
- group_list: Get all groups
- tag_list: Get all tags
- resource_show: Get resource details
- site_read: Get site information
- status_show: Get site status

Authentication: Set CKAN_API_KEY environment variable for a static API key

Full documentation: https://docs.ckan.org/en/latest/api/
";

const FEATURES_DOCS: &str = "Enhanced CKAN MCP Features

- ckan_faceted_search: package search with facet counts (tags, organization,
  res_format by default), field filters, a bbox or point+radius spatial
  constraint and a date range on metadata_created or another date field.
- ckan_related_datasets: datasets sharing tags, the organization or the
  groups (theme) of a source dataset, the source itself excluded.
- ckan_data_quality_check: completeness, format_validation and
  schema_compliance scores from 0 to 100 and their mean.
- ckan_dataset_analytics: site-wide counters for dataset_id \"all\", or the
  resource count, tracking views and downloads of one dataset.
- ckan_resource_preview: resource metadata with the first DataStore rows and
  per-field type information; resources without a DataStore table still get
  a preview with an explanatory note.
- ckan_metadata_exporter: DCAT, Schema.org or raw CKAN records for a list of
  datasets.

Every tool answers with the same envelope: success, data or error
(type, message, tool, arguments) and metadata (timestamp, execution_time_ms,
api_version). GET responses are cached in memory for the configured TTL.
";

#[derive(Debug, Serialize)]
pub struct ResourceInfo {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

fn catalog() -> Vec<ResourceInfo> {
    vec![
        ResourceInfo {
            uri: API_DOCS_URI,
            name: "CKAN API Documentation",
            description: "Summary of the CKAN action API endpoints",
            mime_type: "text/plain",
        },
        ResourceInfo {
            uri: CONFIG_URI,
            name: "CKAN Server Configuration",
            description: "Current CKAN server configuration and connection details",
            mime_type: "application/json",
        },
        ResourceInfo {
            uri: FEATURES_URI,
            name: "Enhanced Features Documentation",
            description: "Documentation for the derived analysis tools",
            mime_type: "text/plain",
        },
    ]
}

/// Connection details of the running server, never the API key itself
fn config_document(state: &ServerState) -> serde_json::Value {
    json!({
        "base_url": state.client.base_url(),
        "api_key_configured": state.client.api_key_configured(),
        "session_active": true,
        "cache_enabled": true,
        "cache_ttl": state.client.cache_ttl().as_secs(),
        "enhanced_features": ENHANCED_FEATURES,
    })
}

pub fn handle_resources_list() -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(json!({ "resources": catalog() }))
        .map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

pub fn handle_resources_read(
    params: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: ReadResourceParams =
        serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;

    let (mime_type, text) = match params.uri.as_str() {
        API_DOCS_URI => ("text/plain", API_DOCS.to_string()),
        FEATURES_URI => ("text/plain", FEATURES_DOCS.to_string()),
        CONFIG_URI => (
            "application/json",
            serde_json::to_string_pretty(&config_document(state))
                .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?,
        ),
        other => {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown resource: {other}"
            )))
        }
    };

    let contents = ResourceContents {
        uri: params.uri,
        mime_type,
        text,
    };

    Ok(json!({ "contents": [contents] }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::state_for;

    #[test]
    fn test_resources_list() {
        let value = handle_resources_list().unwrap();
        let uris: Vec<&str> = value["resources"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["uri"].as_str())
            .collect();

        assert_eq!(uris, vec![API_DOCS_URI, CONFIG_URI, FEATURES_URI]);
    }

    #[tokio::test]
    async fn test_config_resource() {
        let state = state_for("https://data.example.org/");
        let value =
            handle_resources_read(Some(json!({"uri": "ckan://config"})), &state).unwrap();

        let content = &value["contents"][0];
        assert_eq!(content["mimeType"], "application/json");

        let config: serde_json::Value =
            serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(config["base_url"], "https://data.example.org");
        assert_eq!(config["api_key_configured"], false);
        assert_eq!(config["cache_ttl"], 300);
        assert_eq!(config["enhanced_features"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let state = state_for("https://data.example.org");
        let err = handle_resources_read(Some(json!({"uri": "ckan://nope"})), &state).unwrap_err();

        assert_eq!(err.code, -32602);
        assert!(err.message.contains("ckan://nope"));
    }
}
