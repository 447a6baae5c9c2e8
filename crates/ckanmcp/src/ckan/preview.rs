use ckanmcp_core::package::Resource;
use ckanmcp_core::preview::{build_preview, datastore_search_params, DatastoreResult, ResourcePreview};
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use super::resource::resource_show_data;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct PreviewOptions {
    /// Resource id
    pub resource_id: String,

    /// Rows to preview
    #[arg(short = 'n', long, default_value = "10")]
    pub rows: usize,

    /// Skip the per-field summary
    #[arg(long)]
    pub no_stats: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Resource metadata plus the first `preview_rows` DataStore records
///
/// A failing DataStore query does not fail the preview; it yields a preview
/// without rows and an explanatory note.
pub async fn resource_preview_data(
    client: &CkanClient,
    resource_id: &str,
    preview_rows: usize,
    generate_stats: bool,
) -> Result<ResourcePreview, Error> {
    let raw = resource_show_data(client, resource_id).await?;
    let resource: Resource = decode(&raw)?;

    let datastore = match client
        .get_action("datastore_search", &datastore_search_params(resource_id, preview_rows))
        .await
        .and_then(|value| decode::<DatastoreResult>(&value))
    {
        Ok(datastore) => Some(datastore),
        Err(e) => {
            warn!("DataStore unavailable for {resource_id}: {e}");
            None
        }
    };

    Ok(build_preview(resource_id, &resource, datastore, generate_stats))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub async fn run(options: PreviewOptions, client: &CkanClient) -> Result<()> {
    let preview =
        resource_preview_data(client, &options.resource_id, options.rows, !options.no_stats)
            .await?;

    if options.json {
        return super::output_json(&preview);
    }

    super::print_header(&format!(
        "PREVIEW: {}",
        or_na(preview.resource_name.as_deref())
    ));
    println!("{}: {}", "Format".green(), or_na(preview.format.as_deref()));
    println!("{}: {}", "URL".green(), or_na(preview.url.as_deref()).cyan().underline());

    if let Some(note) = &preview.note {
        println!("\n{}", note.yellow());
        return Ok(());
    }

    let records = preview.preview_data.as_deref().unwrap_or_default();
    println!(
        "{}: {} (showing {})",
        "Total records".green(),
        preview.total_records.unwrap_or(0),
        records.len()
    );

    let columns: Vec<String> = records
        .first()
        .and_then(Value::as_object)
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    if !columns.is_empty() {
        let mut table = new_table();
        table.set_titles(columns.iter().collect());
        for record in records {
            table.add_row(
                columns
                    .iter()
                    .map(|column| cell_text(record.get(column)))
                    .collect(),
            );
        }
        table.printstd();
    }

    if let Some(stats) = &preview.field_statistics {
        println!("\n{}", "Fields:".bright_yellow().bold());
        for field in stats {
            println!(
                "  {} ({})",
                or_na(field.id.as_deref()),
                or_na(field.field_type.as_deref()).bright_black()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::client::ClientConfig;
    use ckanmcp_core::preview::DATASTORE_UNAVAILABLE_NOTE;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resource_mock() -> Mock {
        Mock::given(method("GET"))
            .and(path("/api/3/action/resource_show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"id": "r1", "name": "Counts", "format": "CSV"}
            })))
    }

    #[tokio::test]
    async fn test_preview_degrades_without_datastore() {
        let server = MockServer::start().await;
        resource_mock().mount(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": {"message": "Not found: Resource \"r1\" was not found."}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let preview = resource_preview_data(&client, "r1", 10, true).await.unwrap();

        assert!(preview.preview_data.is_none());
        assert_eq!(preview.note.as_deref(), Some(DATASTORE_UNAVAILABLE_NOTE));
        assert_eq!(preview.format.as_deref(), Some("CSV"));
    }

    #[tokio::test]
    async fn test_preview_with_records() {
        let server = MockServer::start().await;
        resource_mock().mount(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/datastore_search"))
            .and(query_param("resource_id", "r1"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "records": [{"a": 1}, {"a": 2}],
                    "total": 40,
                    "fields": [{"id": "a", "type": "int4"}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let preview = resource_preview_data(&client, "r1", 2, true).await.unwrap();

        assert_eq!(preview.preview_data.as_ref().map(Vec::len), Some(2));
        assert_eq!(preview.total_records, Some(40));
        assert_eq!(preview.field_statistics.as_ref().map(Vec::len), Some(1));
        assert!(preview.note.is_none());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!("x"))), "x");
        assert_eq!(cell_text(Some(&json!(3.5))), "3.5");
    }
}
