use std::time::Instant;

use chrono::Utc;
use ckanmcp_core::envelope::{classify_error, iso_timestamp, ResponseEnvelope};
use ckanmcp_core::query::{FacetedSearch, PackageSearch};
use ckanmcp_core::related::RelationType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ckan::quality::DEFAULT_SAMPLE_SIZE;
use crate::ckan::{analytics, export, list, org, preview, quality, related, resource, search, show};
use crate::ckan::CkanClient;
use crate::prelude::*;

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct PackageListArgs {
    limit: Option<u64>,
    offset: Option<u64>,
}

#[derive(Deserialize)]
struct AllFieldsArgs {
    all_fields: Option<bool>,
}

#[derive(Deserialize)]
struct OrganizationShowArgs {
    id: String,
    include_datasets: Option<bool>,
}

#[derive(Deserialize)]
struct TagListArgs {
    vocabulary_id: Option<String>,
}

#[derive(Deserialize)]
struct RelatedArgs {
    dataset_id: String,
    relation_type: Option<String>,
    max_results: Option<usize>,
}

#[derive(Deserialize)]
struct QualityArgs {
    dataset_id: String,
    checks: Option<Vec<String>>,
    sample_size: Option<u64>,
}

#[derive(Deserialize)]
struct AnalyticsArgs {
    dataset_id: Option<String>,
    time_range: Option<Value>,
    metrics: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct PreviewArgs {
    resource_id: String,
    preview_rows: Option<usize>,
    generate_stats: Option<bool>,
}

#[derive(Deserialize)]
struct ExportArgs {
    dataset_ids: Vec<String>,
    export_format: Option<String>,
    include_resources: Option<bool>,
}

/// Missing arguments are treated as an empty object
fn parse_args<T: DeserializeOwned>(arguments: Option<&Value>) -> Result<T, Error> {
    let value = match arguments {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value) => value.clone(),
    };
    serde_json::from_value(value).map_err(|e| Error::InvalidParameters(e.to_string()))
}

fn to_value<T: Serialize>(data: T) -> Result<Value, Error> {
    serde_json::to_value(data).map_err(|e| Error::Serialization(e.to_string()))
}

async fn call(client: &CkanClient, name: &str, arguments: Option<&Value>) -> Result<Value, Error> {
    match name {
        "ckan_package_list" => {
            let args: PackageListArgs = parse_args(arguments)?;
            list::package_list_data(client, args.limit.unwrap_or(100), args.offset.unwrap_or(0))
                .await
        }
        "ckan_package_show" => {
            let args: IdArgs = parse_args(arguments)?;
            show::package_show_data(client, &args.id).await
        }
        "ckan_package_search" => {
            let args: PackageSearch = parse_args(arguments)?;
            search::package_search_data(client, &args).await
        }
        "ckan_organization_list" => {
            let args: AllFieldsArgs = parse_args(arguments)?;
            list::organization_list_data(client, args.all_fields.unwrap_or(false)).await
        }
        "ckan_organization_show" => {
            let args: OrganizationShowArgs = parse_args(arguments)?;
            org::organization_show_data(client, &args.id, args.include_datasets.unwrap_or(false))
                .await
        }
        "ckan_group_list" => {
            let args: AllFieldsArgs = parse_args(arguments)?;
            list::group_list_data(client, args.all_fields.unwrap_or(false)).await
        }
        "ckan_tag_list" => {
            let args: TagListArgs = parse_args(arguments)?;
            list::tag_list_data(client, args.vocabulary_id.as_deref()).await
        }
        "ckan_resource_show" => {
            let args: IdArgs = parse_args(arguments)?;
            resource::resource_show_data(client, &args.id).await
        }
        "ckan_site_read" => list::site_read_data(client).await,
        "ckan_status_show" => list::status_show_data(client).await,
        "ckan_faceted_search" => {
            let args: FacetedSearch = parse_args(arguments)?;
            search::faceted_search_data(client, &args).await
        }
        "ckan_related_datasets" => {
            let args: RelatedArgs = parse_args(arguments)?;
            let relation = match args.relation_type.as_deref() {
                Some(relation) => relation
                    .parse::<RelationType>()
                    .map_err(Error::InvalidParameters)?,
                None => RelationType::default(),
            };
            let related = related::related_datasets_data(
                client,
                &args.dataset_id,
                relation,
                args.max_results.unwrap_or(10),
            )
            .await?;
            Ok(Value::Array(related))
        }
        "ckan_data_quality_check" => {
            let args: QualityArgs = parse_args(arguments)?;
            let report = quality::quality_check_data(
                client,
                &args.dataset_id,
                args.checks.as_deref(),
                args.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
            )
            .await?;
            to_value(report)
        }
        "ckan_dataset_analytics" => {
            let args: AnalyticsArgs = parse_args(arguments)?;
            let dataset_id = args
                .dataset_id
                .unwrap_or_else(|| ckanmcp_core::analytics::ALL_DATASETS.to_string());
            let report = analytics::analytics_data(
                client,
                &dataset_id,
                args.time_range,
                args.metrics.as_deref(),
            )
            .await?;
            to_value(report)
        }
        "ckan_resource_preview" => {
            let args: PreviewArgs = parse_args(arguments)?;
            let preview = preview::resource_preview_data(
                client,
                &args.resource_id,
                args.preview_rows.unwrap_or(10),
                args.generate_stats.unwrap_or(true),
            )
            .await?;
            to_value(preview)
        }
        "ckan_metadata_exporter" => {
            let args: ExportArgs = parse_args(arguments)?;
            let bundle = export::export_metadata_data(
                client,
                &args.dataset_ids,
                args.export_format.as_deref().unwrap_or("dcat"),
                args.include_resources.unwrap_or(true),
            )
            .await?;
            to_value(bundle)
        }
        other => Err(Error::UnknownTool(other.to_string())),
    }
}

/// Run one tool and wrap its outcome in a response envelope
///
/// Every failure ends up in the envelope; nothing propagates to the caller.
pub async fn dispatch(
    client: &CkanClient,
    name: &str,
    arguments: Option<Value>,
) -> ResponseEnvelope {
    let started = Instant::now();

    match call(client, name, arguments.as_ref()).await {
        Ok(data) => ResponseEnvelope::success(data, iso_timestamp(Utc::now()))
            .with_execution_time(started.elapsed().as_millis() as u64),
        Err(e) => {
            error!("Error calling tool {name}: {e}");
            let message = e.to_string();
            ResponseEnvelope::failure(
                classify_error(&message),
                message,
                name,
                arguments.unwrap_or(Value::Null),
                iso_timestamp(Utc::now()),
            )
            .with_execution_time(started.elapsed().as_millis() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::ClientConfig;
    use ckanmcp_core::envelope::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_client() -> CkanClient {
        CkanClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let envelope = dispatch(&offline_client(), "ckan_nope", None).await;

        assert!(!envelope.success);
        let error = envelope.error.unwrap();
        assert_eq!(error.kind, ErrorKind::CkanApiError);
        assert_eq!(error.message, "Unknown tool: ckan_nope");
        assert_eq!(error.tool, "ckan_nope");
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let arguments = json!({"include_datasets": true});
        let envelope =
            dispatch(&offline_client(), "ckan_organization_show", Some(arguments.clone())).await;

        let error = envelope.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InvalidParameters);
        assert_eq!(error.arguments, arguments);
    }

    #[tokio::test]
    async fn test_invalid_relation_type() {
        let envelope = dispatch(
            &offline_client(),
            "ckan_related_datasets",
            Some(json!({"dataset_id": "roads", "relation_type": "author"})),
        )
        .await;

        assert_eq!(envelope.error.unwrap().kind, ErrorKind::InvalidParameters);
    }

    #[tokio::test]
    async fn test_package_list_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_list"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "result": ["a", "b"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let envelope = dispatch(&client, "ckan_package_list", None).await;

        assert!(envelope.success);
        assert_eq!(envelope.data, Some(json!(["a", "b"])));
        assert!(envelope.error.is_none());
        assert_eq!(envelope.metadata.api_version, "2.0.0");
    }

    #[tokio::test]
    async fn test_portal_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": {"message": "Not found", "__type": "Not Found Error"}
            })))
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let envelope = dispatch(&client, "ckan_package_show", Some(json!({"id": "gone"}))).await;

        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.unwrap().kind, ErrorKind::DataNotFound);
    }

    #[tokio::test]
    async fn test_failure_records_execution_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"success": false, "error": {"message": "Not found"}}))
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let envelope = dispatch(&client, "ckan_package_show", Some(json!({"id": "slow"}))).await;

        assert!(!envelope.success);
        assert!(envelope.metadata.execution_time_ms >= 300);
    }

    #[tokio::test]
    async fn test_network_failure() {
        let envelope = dispatch(&offline_client(), "ckan_status_show", None).await;

        assert_eq!(envelope.error.unwrap().kind, ErrorKind::NetworkError);
    }
}
