use ckanmcp_core::analytics::{
    dataset_analytics, popular_search_params, portal_statistics, recent_search_params,
    site_analytics, AnalyticsMetrics, AnalyticsReport, PortalStatistics, ALL_DATASETS,
    DEFAULT_METRICS,
};
use ckanmcp_core::package::{Package, PackageSearchResult};
use ckanmcp_core::query::{QueryParams, MATCH_ALL};
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use super::list::{organization_list_data, status_show_data, tag_list_data};
use super::show::package_show_data;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct AnalyticsOptions {
    /// Dataset id, name or portal URL; `all` for the whole portal
    #[arg(default_value = ALL_DATASETS)]
    pub dataset: String,

    /// Metrics to report: views, downloads, api_calls, resource_count
    #[arg(short, long, value_delimiter = ',')]
    pub metrics: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct StatsOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Usage analytics for one dataset or, for `all`, the whole portal
///
/// The site-wide report issues its four portal calls concurrently. `metrics`
/// of `None` selects the default metric set.
pub async fn analytics_data(
    client: &CkanClient,
    dataset_id: &str,
    time_range: Option<Value>,
    metrics: Option<&[String]>,
) -> Result<AnalyticsReport, Error> {
    if dataset_id == ALL_DATASETS {
        let list_params = QueryParams::new();
        let recent_params = recent_search_params();
        let popular_params = popular_search_params();

        let (status, package_list, recent, popular) = futures::try_join!(
            status_show_data(client),
            client.get_action("package_list", &list_params),
            client.get_action("package_search", &recent_params),
            client.get_action("package_search", &popular_params),
        )?;

        let recent: PackageSearchResult = decode(&recent)?;
        let popular: PackageSearchResult = decode(&popular)?;

        return Ok(site_analytics(
            time_range,
            &package_list,
            status,
            &recent,
            &popular,
        ));
    }

    let raw = package_show_data(client, dataset_id).await?;
    let package: Package = decode(&raw)?;

    let report = match metrics {
        Some(metrics) => dataset_analytics(dataset_id, time_range, &package, metrics),
        None => dataset_analytics(dataset_id, time_range, &package, &DEFAULT_METRICS),
    };
    Ok(report)
}

/// Portal-wide counters: datasets, organizations, tags and CKAN version
pub async fn portal_statistics_data(client: &CkanClient) -> Result<PortalStatistics, Error> {
    let search_params = QueryParams::new().with("q", MATCH_ALL).with("rows", 1);

    let (search, organizations, tags, status) = futures::try_join!(
        client.get_action("package_search", &search_params),
        organization_list_data(client, false),
        tag_list_data(client, None),
        status_show_data(client),
    )?;

    let search: PackageSearchResult = decode(&search)?;
    Ok(portal_statistics(&search, &organizations, &tags, &status))
}

fn display_count(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

pub async fn run(options: AnalyticsOptions, client: &CkanClient) -> Result<()> {
    let id = if options.dataset == ALL_DATASETS {
        options.dataset.clone()
    } else {
        super::extract_dataset_id(&options.dataset)?
    };
    let metrics = (!options.metrics.is_empty()).then_some(options.metrics.as_slice());

    let report = analytics_data(client, &id, None, metrics).await?;

    if options.json {
        return super::output_json(&report);
    }

    super::print_header(&format!("ANALYTICS: {}", report.dataset_id));
    let mut table = new_table();

    match &report.metrics {
        AnalyticsMetrics::Site(site) => {
            table.add_row(prettytable::row!["Total datasets".bold().cyan(), site.total_datasets]);
            table.add_row(prettytable::row!["Recent datasets".bold().cyan(), site.recent_datasets]);
            table.add_row(prettytable::row![
                "CKAN version".bold().cyan(),
                site.site_status
                    .get("ckan_version")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
            ]);
            table.printstd();

            println!("\n{}", "Popular datasets:".bright_yellow().bold());
            for (idx, ds) in site.popular_datasets.iter().enumerate() {
                println!(
                    "  {}. {} ({} resources)",
                    idx + 1,
                    or_na(ds.name.as_deref()),
                    ds.resources
                );
            }
        }
        AnalyticsMetrics::Dataset(ds) => {
            table.add_row(prettytable::row!["Resources".bold().cyan(), display_count(ds.resource_count)]);
            table.add_row(prettytable::row!["Views".bold().cyan(), display_count(ds.views)]);
            table.add_row(prettytable::row!["Downloads".bold().cyan(), display_count(ds.downloads)]);
            table.add_row(prettytable::row!["Tags".bold().cyan(), ds.tags_count]);
            table.add_row(prettytable::row![
                "Organization".bold().cyan(),
                or_na(ds.organization.as_deref())
            ]);
            table.add_row(prettytable::row!["Created".bold().cyan(), prefix(ds.created.as_deref(), 10)]);
            table.add_row(prettytable::row!["Modified".bold().cyan(), prefix(ds.modified.as_deref(), 10)]);
            table.printstd();
        }
    }

    Ok(())
}

pub async fn run_stats(options: StatsOptions, client: &CkanClient) -> Result<()> {
    let stats = portal_statistics_data(client).await?;

    if options.json {
        return super::output_json(&stats);
    }

    println!("{}", "Portal Statistics".bright_cyan().bold());
    let mut table = new_table();
    table.add_row(prettytable::row!["Total Packages".bold().cyan(), stats.total_packages]);
    table.add_row(prettytable::row!["Total Organizations".bold().cyan(), stats.total_organizations]);
    table.add_row(prettytable::row!["Total Tags".bold().cyan(), stats.total_tags]);
    table.add_row(prettytable::row!["CKAN Version".bold().cyan(), stats.ckan_version]);
    table.printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"success": true, "result": result}))
    }

    #[tokio::test]
    async fn test_site_wide_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/status_show"))
            .respond_with(ok(json!({"ckan_version": "2.10.4"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_list"))
            .respond_with(ok(json!(["a", "b", "c", "d"])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_search"))
            .and(query_param("sort", "metadata_created desc"))
            .respond_with(ok(json!({"count": 4, "results": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_search"))
            .and(query_param("sort", "num_resources desc"))
            .respond_with(ok(json!({
                "count": 4,
                "results": [{"id": "1", "name": "big", "num_resources": 12}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let report = analytics_data(&client, "all", None, None).await.unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["dataset_id"], "all");
        assert_eq!(value["time_range"], json!({"start": "30_days_ago", "end": "now"}));
        assert_eq!(value["metrics"]["total_datasets"], 4);
        assert_eq!(value["metrics"]["recent_datasets"], 4);
        assert_eq!(value["metrics"]["site_status"]["ckan_version"], "2.10.4");
        assert_eq!(
            value["metrics"]["popular_datasets"],
            json!([{"id": "1", "name": "big", "resources": 12}])
        );
    }

    #[tokio::test]
    async fn test_dataset_report_uses_default_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .and(query_param("id", "roads"))
            .respond_with(ok(json!({
                "resources": [{}, {}],
                "tags": [{"name": "t"}],
                "tracking_summary": {"total": 9, "recent": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let report = analytics_data(&client, "roads", None, None).await.unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["metrics"]["resource_count"], 2);
        assert_eq!(value["metrics"]["views"], 9);
        assert_eq!(value["metrics"]["downloads"], 2);
        assert_eq!(value["metrics"]["tags_count"], 1);
        assert!(value["metrics"].get("api_calls").is_none());
    }

    #[tokio::test]
    async fn test_portal_statistics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_search"))
            .and(query_param("rows", "1"))
            .respond_with(ok(json!({"count": 321, "results": [{}]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/organization_list"))
            .respond_with(ok(json!(["a", "b"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/tag_list"))
            .respond_with(ok(json!(["x"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/status_show"))
            .respond_with(ok(json!({"ckan_version": "2.9"})))
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let stats = portal_statistics_data(&client).await.unwrap();

        assert_eq!(stats.total_packages, 321);
        assert_eq!(stats.total_organizations, 2);
        assert_eq!(stats.total_tags, 1);
        assert_eq!(stats.ckan_version, "2.9");
    }
}
