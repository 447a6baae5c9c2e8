mod cli;
mod resources;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use std::sync::Arc;

use crate::ckan::CkanClient;
use crate::prelude::*;
use serde::{Deserialize, Serialize};

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Everything a request handler needs: the global flags and the one portal
/// client shared by every request for the lifetime of the server
#[derive(Debug)]
pub struct ServerState {
    pub global: crate::Global,
    pub client: CkanClient,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = crate::ckan::client_config(&global, None)?;
    let client = CkanClient::new(config)?;
    let state = Arc::new(ServerState { global, client });

    let result = match app.command {
        cli::Commands::Stdio => stdio::run_stdio(Arc::clone(&state)).await,
        cli::Commands::Sse(options) => sse::run_sse(options, Arc::clone(&state)).await,
    };

    match Arc::try_unwrap(state) {
        Ok(state) => state.client.shutdown(),
        Err(_) => warn!("CKAN client still shared at shutdown, dropping without closing"),
    }

    result
}

pub async fn handle_request(request_str: &str, state: &ServerState) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                    data: None,
                }),
            };
        }
    };

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, state).await,
        "resources/list" => resources::handle_resources_list(),
        "resources/read" => resources::handle_resources_read(request.params, state),
        method => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::ClientConfig;
    use serde_json::{json, Value};

    pub(crate) fn state_for(base_url: &str) -> ServerState {
        ServerState {
            global: crate::Global {
                ckan_url: Some(base_url.to_string()),
                api_key: None,
                cache_ttl: 300,
                verbose: false,
            },
            client: CkanClient::new(ClientConfig::new(base_url)).unwrap(),
        }
    }

    async fn call(state: &ServerState, request: Value) -> Value {
        let response = handle_request(&request.to_string(), state).await;
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_parse_error() {
        let state = state_for("http://127.0.0.1:9");
        let response = serde_json::to_value(handle_request("{not json", &state).await).unwrap();

        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let state = state_for("http://127.0.0.1:9");
        let response = call(
            &state,
            json!({"jsonrpc": "2.0", "id": 7, "method": "prompts/list"}),
        )
        .await;

        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools_and_resources() {
        let state = state_for("http://127.0.0.1:9");
        let response = call(
            &state,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["serverInfo"]["name"], "ckanmcp");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_catalog() {
        let state = state_for("http://127.0.0.1:9");
        let response = call(
            &state,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 16);
        assert!(tools
            .iter()
            .all(|t| t["name"].as_str().unwrap().starts_with("ckan_")));
        let exporter = tools
            .iter()
            .find(|t| t["name"] == "ckan_metadata_exporter")
            .unwrap();
        assert_eq!(exporter["inputSchema"]["required"], json!(["dataset_ids"]));
    }
}
