use chrono::Utc;
use ckanmcp_core::envelope::iso_timestamp;
use ckanmcp_core::package::Package;
use ckanmcp_core::quality::{score_quality, QualityCheck, QualityReport};
use colored::Colorize;

use super::client::{decode, CkanClient};
use super::show::package_show_data;
use crate::prelude::{println, *};

/// Records requested for sampling when the caller does not say
pub const DEFAULT_SAMPLE_SIZE: u64 = 100;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct QualityOptions {
    /// Dataset id, name or portal URL
    pub dataset: String,

    /// Checks to run: completeness, format_validation, schema_compliance
    #[arg(short, long, value_delimiter = ',')]
    pub checks: Vec<String>,

    /// Records to sample
    #[arg(long, default_value = "100")]
    pub sample_size: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Score a dataset's metadata
///
/// `checks` of `None` runs every check. `sample_size` is accepted but checks
/// always run over the full resource list.
pub async fn quality_check_data(
    client: &CkanClient,
    dataset_id: &str,
    checks: Option<&[String]>,
    sample_size: u64,
) -> Result<QualityReport, Error> {
    let checks = match checks {
        Some(names) => QualityCheck::parse_list(names),
        None => QualityCheck::ALL.to_vec(),
    };
    debug!("Quality check of {dataset_id}: {checks:?} (sample size {sample_size})");

    let raw = package_show_data(client, dataset_id).await?;
    let package: Package = decode(&raw)?;

    Ok(score_quality(
        dataset_id,
        &package,
        &checks,
        iso_timestamp(Utc::now()),
    ))
}

fn score_colored(score: f64) -> String {
    let text = format!("{score:.1}");
    if score >= 80.0 {
        text.green().bold().to_string()
    } else if score >= 50.0 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

pub async fn run(options: QualityOptions, client: &CkanClient) -> Result<()> {
    let id = super::extract_dataset_id(&options.dataset)?;
    let checks = (!options.checks.is_empty()).then_some(options.checks.as_slice());
    let report = quality_check_data(client, &id, checks, options.sample_size).await?;

    if options.json {
        return super::output_json(&report);
    }

    super::print_header(&format!(
        "QUALITY: {}",
        report.dataset_name.as_deref().unwrap_or(&report.dataset_id)
    ));

    let mut table = new_table();
    table.add_row(prettytable::row!["Check".bold(), "Score".bold(), "Detail".bold()]);

    if let Some(check) = &report.checks.completeness {
        table.add_row(prettytable::row![
            "completeness",
            score_colored(check.score),
            format!(
                "{} of {} required fields",
                check.present_fields,
                check.required_fields.len()
            )
        ]);
    }
    if let Some(check) = &report.checks.format_validation {
        table.add_row(prettytable::row![
            "format_validation",
            score_colored(check.score),
            format!("{} resources", check.resource_count)
        ]);
    }
    if let Some(check) = &report.checks.schema_compliance {
        let flags = [
            ("license", check.has_license),
            ("author", check.has_author),
            ("maintainer", check.has_maintainer),
            ("temporal", check.has_temporal_coverage),
            ("spatial", check.has_spatial_coverage),
        ];
        let present: Vec<&str> = flags
            .iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| *name)
            .collect();
        table.add_row(prettytable::row![
            "schema_compliance",
            score_colored(check.score),
            format!("has: {}", present.join(", "))
        ]);
    }
    table.printstd();

    println!(
        "\n{}: {}",
        "Overall score".bold(),
        score_colored(report.overall_score)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckan::client::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_quality_check_over_portal_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {
                    "name": "roads",
                    "title": "Roads",
                    "resources": [{"format": "csv", "url": "https://e.com/r.csv"}]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let report = quality_check_data(&client, "roads", None, DEFAULT_SAMPLE_SIZE)
            .await
            .unwrap();

        assert_eq!(report.dataset_name.as_deref(), Some("roads"));
        assert_eq!(report.checks.completeness.as_ref().unwrap().score, 40.0);
        assert_eq!(report.checks.format_validation.as_ref().unwrap().score, 100.0);
        assert_eq!(report.checks.schema_compliance.as_ref().unwrap().score, 0.0);
        assert!((report.overall_score - 140.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_only_requested_checks_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/3/action/package_show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"name": "empty", "resources": []}
            })))
            .mount(&server)
            .await;

        let client = CkanClient::new(ClientConfig::new(server.uri())).unwrap();
        let checks = vec!["format_validation".to_string()];
        let report = quality_check_data(&client, "empty", Some(checks.as_slice()), 5)
            .await
            .unwrap();

        assert!(report.checks.completeness.is_none());
        assert_eq!(report.checks.format_validation.as_ref().unwrap().score, 0.0);
        assert_eq!(report.overall_score, 0.0);
    }
}
