mod ckan;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::ServerState;
use crate::prelude::{eprintln, *};

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<EmptyCapability>,
    pub resources: Option<EmptyCapability>,
}

#[derive(Debug, Serialize)]
pub struct EmptyCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(EmptyCapability {}),
            resources: Some(EmptyCapability {}),
        },
        server_info: ServerInfo {
            name: "ckanmcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_arguments() -> serde_json::Value {
    json!({"type": "object", "properties": {}})
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        tool(
            "ckan_package_list",
            "Get list of all packages (datasets) in CKAN (unsorted)",
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "Maximum number of packages to return", "default": 100},
                    "offset": {"type": "integer", "description": "Offset for pagination", "default": 0}
                }
            }),
        ),
        tool(
            "ckan_package_show",
            "Get details of a specific package/dataset, including its creation and modification dates",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Package ID or name"}
                },
                "required": ["id"]
            }),
        ),
        tool(
            "ckan_package_search",
            "Search for packages using Solr queries. Only the supplied arguments are forwarded to the portal.",
            json!({
                "type": "object",
                "properties": {
                    "q": {"type": "string", "description": "Search query", "default": "*:*"},
                    "fq": {"type": "string", "description": "Filter query"},
                    "sort": {"type": "string", "description": "Sort field and direction (e.g., 'score desc')"},
                    "rows": {"type": "integer", "description": "Number of results to return", "default": 10},
                    "start": {"type": "integer", "description": "Offset for pagination", "default": 0}
                }
            }),
        ),
        tool(
            "ckan_organization_list",
            "Get list of all organizations",
            json!({
                "type": "object",
                "properties": {
                    "all_fields": {"type": "boolean", "description": "Include all organization fields", "default": false}
                }
            }),
        ),
        tool(
            "ckan_organization_show",
            "Get details of a specific organization",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Organization ID or name"},
                    "include_datasets": {"type": "boolean", "description": "Include organization's datasets", "default": false}
                },
                "required": ["id"]
            }),
        ),
        tool(
            "ckan_group_list",
            "Get list of all groups",
            json!({
                "type": "object",
                "properties": {
                    "all_fields": {"type": "boolean", "description": "Include all group fields", "default": false}
                }
            }),
        ),
        tool(
            "ckan_tag_list",
            "Get list of all tags",
            json!({
                "type": "object",
                "properties": {
                    "vocabulary_id": {"type": "string", "description": "Vocabulary ID to filter tags"}
                }
            }),
        ),
        tool(
            "ckan_resource_show",
            "Get details of a specific resource",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Resource ID"}
                },
                "required": ["id"]
            }),
        ),
        tool(
            "ckan_site_read",
            "Get site information and statistics",
            no_arguments(),
        ),
        tool(
            "ckan_status_show",
            "Get CKAN site status and version information",
            no_arguments(),
        ),
        tool(
            "ckan_faceted_search",
            "Advanced search with faceting for refined data discovery. Facets default to tags, organization and res_format.",
            json!({
                "type": "object",
                "properties": {
                    "q": {"type": "string", "description": "Search query", "default": "*:*"},
                    "facet_fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Fields to facet on (tags, organization, res_format)"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Filter conditions as field:value pairs; array values match any of their items"
                    },
                    "spatial_query": {
                        "type": "object",
                        "description": "Geographic search with bbox [min_lon, min_lat, max_lon, max_lat] or point [lat, lon] + radius"
                    },
                    "date_range": {
                        "type": "object",
                        "description": "Temporal filtering with start/end dates on field (default: metadata_created)"
                    }
                }
            }),
        ),
        tool(
            "ckan_related_datasets",
            "Find datasets related to a given dataset by shared tags, organization or groups",
            json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Source dataset ID"},
                    "relation_type": {
                        "type": "string",
                        "enum": ["tags", "theme", "organization"],
                        "description": "Type of relationship",
                        "default": "tags"
                    },
                    "max_results": {"type": "integer", "description": "Maximum results", "default": 10}
                },
                "required": ["dataset_id"]
            }),
        ),
        tool(
            "ckan_data_quality_check",
            "Analyze data quality metrics for datasets. Scores range from 0 to 100.",
            json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset to analyze"},
                    "checks": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "enum": ["completeness", "format_validation", "schema_compliance"]
                        },
                        "description": "Quality checks to perform (default: all)"
                    },
                    "sample_size": {"type": "integer", "description": "Records to sample", "default": 100}
                },
                "required": ["dataset_id"]
            }),
        ),
        tool(
            "ckan_dataset_analytics",
            "Generate analytics about dataset usage and engagement",
            json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset ID or 'all'", "default": "all"},
                    "time_range": {"type": "object", "description": "Analytics time period"},
                    "metrics": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Metrics to calculate (views, downloads, api_calls, resource_count)"
                    }
                }
            }),
        ),
        tool(
            "ckan_resource_preview",
            "Generate preview and summary statistics for resources stored in the DataStore",
            json!({
                "type": "object",
                "properties": {
                    "resource_id": {"type": "string", "description": "Resource ID"},
                    "preview_rows": {"type": "integer", "description": "Rows to preview", "default": 10},
                    "generate_stats": {"type": "boolean", "description": "Generate statistics", "default": true}
                },
                "required": ["resource_id"]
            }),
        ),
        tool(
            "ckan_metadata_exporter",
            "Export metadata in various standards (DCAT, Schema.org)",
            json!({
                "type": "object",
                "properties": {
                    "dataset_ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Dataset IDs to export"
                    },
                    "export_format": {
                        "type": "string",
                        "enum": ["dcat", "schema_org", "ckan_native"],
                        "description": "Export format",
                        "default": "dcat"
                    },
                    "include_resources": {"type": "boolean", "description": "Include resources", "default": true}
                },
                "required": ["dataset_ids"]
            }),
        ),
    ];

    let result = ToolsList { tools };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;

    if state.global.verbose {
        eprintln!("Calling {}: {:?}", params.name, params.arguments);
    }

    let envelope = ckan::dispatch(&state.client, &params.name, params.arguments).await;
    debug!(
        "{} finished in {}ms (success: {})",
        params.name, envelope.metadata.execution_time_ms, envelope.success
    );

    let text = serde_json::to_string_pretty(&envelope)
        .map_err(|e| JsonRpcError::internal(format!("Serialization error: {e}")))?;

    let result = CallToolResult {
        content: vec![Content::Text { text }],
        is_error: (!envelope.success).then_some(true),
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError::internal(format!("Internal error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tests::state_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope_of(result: &serde_json::Value) -> serde_json::Value {
        let text = result["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_call_wraps_envelope_in_text_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/status_show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"ckan_version": "2.10.4"}
            })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let result = handle_tools_call(Some(json!({"name": "ckan_status_show"})), &state)
            .await
            .unwrap();

        assert_eq!(result["content"][0]["type"], "text");
        assert!(result.get("isError").is_none());

        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["ckan_version"], "2.10.4");
        assert_eq!(envelope["metadata"]["api_version"], "2.0.0");
    }

    #[tokio::test]
    async fn test_failed_envelope_sets_is_error() {
        let state = state_for("http://127.0.0.1:9");
        let result = handle_tools_call(
            Some(json!({"name": "ckan_unknown", "arguments": {"x": 1}})),
            &state,
        )
        .await
        .unwrap();

        assert_eq!(result["isError"], true);
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"]["type"], "ckan_api_error");
        assert_eq!(envelope["error"]["message"], "Unknown tool: ckan_unknown");
        assert_eq!(envelope["error"]["arguments"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_call_without_name_is_invalid_params() {
        let state = state_for("http://127.0.0.1:9");
        let err = handle_tools_call(Some(json!({"arguments": {}})), &state)
            .await
            .unwrap_err();

        assert_eq!(err.code, -32602);
    }
}
