use ckanmcp_core::query::QueryParams;
use colored::Colorize;
use serde_json::Value;

use super::client::CkanClient;
use crate::prelude::{println, *};

#[derive(Debug, Clone, Copy, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListEntity {
    Packages,
    Orgs,
    Tags,
}

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ListOptions {
    /// What to list
    #[arg(value_enum)]
    pub entity: ListEntity,

    /// Number of entries to show
    #[arg(short = 'n', long, default_value = "20")]
    pub number: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn package_list_data(client: &CkanClient, limit: u64, offset: u64) -> Result<Value, Error> {
    let params = QueryParams::new().with("limit", limit).with("offset", offset);
    client.get_action("package_list", &params).await
}

pub async fn organization_list_data(client: &CkanClient, all_fields: bool) -> Result<Value, Error> {
    let params = QueryParams::new().with("all_fields", all_fields);
    client.get_action("organization_list", &params).await
}

pub async fn group_list_data(client: &CkanClient, all_fields: bool) -> Result<Value, Error> {
    let params = QueryParams::new().with("all_fields", all_fields);
    client.get_action("group_list", &params).await
}

pub async fn tag_list_data(client: &CkanClient, vocabulary_id: Option<&str>) -> Result<Value, Error> {
    let params = QueryParams::new().with_opt("vocabulary_id", vocabulary_id);
    client.get_action("tag_list", &params).await
}

pub async fn site_read_data(client: &CkanClient) -> Result<Value, Error> {
    client.get_action("site_read", &QueryParams::new()).await
}

pub async fn status_show_data(client: &CkanClient) -> Result<Value, Error> {
    client.get_action("status_show", &QueryParams::new()).await
}

/// Display label of a list entry: plain strings as-is, objects by display name
fn entry_label(entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("display_name")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        other => other.to_string(),
    }
}

pub async fn run(options: ListOptions, client: &CkanClient) -> Result<()> {
    let (title, result) = match options.entity {
        ListEntity::Packages => (
            format!("Packages (first {})", options.number),
            package_list_data(client, options.number as u64, 0).await?,
        ),
        ListEntity::Orgs => ("Organizations".to_string(), organization_list_data(client, true).await?),
        ListEntity::Tags => ("Tags".to_string(), tag_list_data(client, None).await?),
    };

    let entries: Vec<Value> = result
        .as_array()
        .map(|items| items.iter().take(options.number).cloned().collect())
        .unwrap_or_default();

    if options.json {
        return super::output_json(&entries);
    }

    println!("{}", title.bright_cyan().bold());
    for (idx, entry) in entries.iter().enumerate() {
        let label = entry_label(entry);
        match entry.get("package_count").and_then(Value::as_u64) {
            Some(count) => println!("  {}. {} ({count} datasets)", idx + 1, label),
            None => println!("  {}. {}", idx + 1, label),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_entry_label() {
        assert_eq!(entry_label(&json!("roads")), "roads");
        assert_eq!(
            entry_label(&json!({"name": "city", "display_name": "City Council"})),
            "City Council"
        );
        assert_eq!(entry_label(&json!({"name": "city"})), "city");
        assert_eq!(entry_label(&json!({})), "Unknown");
    }

    #[tokio::test]
    async fn test_list_defaults_on_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_list"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": ["a", "b"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/group_list"))
            .and(query_param("all_fields", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();

        let packages = package_list_data(&client, 100, 0).await.unwrap();
        assert_eq!(packages, json!(["a", "b"]));
        group_list_data(&client, false).await.unwrap();
    }
}
