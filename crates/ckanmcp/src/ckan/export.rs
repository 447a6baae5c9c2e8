use chrono::Utc;
use ckanmcp_core::envelope::iso_timestamp;
use ckanmcp_core::export::{export_dataset, ExportBundle, ExportFormat};
use colored::Colorize;

use super::client::CkanClient;
use super::show::package_show_data;
use crate::prelude::{eprintln, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ExportOptions {
    /// Dataset ids, names or portal URLs
    #[arg(required = true)]
    pub datasets: Vec<String>,

    /// Export format: dcat, schema_org or ckan_native
    #[arg(short, long, default_value = "dcat")]
    pub format: String,

    /// Leave resources out of the exported records
    #[arg(long)]
    pub no_resources: bool,
}

/// Fetch each dataset in order and transform it into `export_format`
///
/// Datasets are still fetched for an unknown format, but no entry is added
/// for them.
pub async fn export_metadata_data(
    client: &CkanClient,
    dataset_ids: &[String],
    export_format: &str,
    include_resources: bool,
) -> Result<ExportBundle, Error> {
    if ExportFormat::parse(export_format).is_none() {
        warn!("Unknown export format {export_format}, datasets will be skipped");
    }

    let mut bundle = ExportBundle::new(export_format, iso_timestamp(Utc::now()));

    for id in dataset_ids {
        let raw = package_show_data(client, id).await?;
        let exported = export_dataset(export_format, raw, include_resources)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        if let Some(dataset) = exported {
            bundle.datasets.push(dataset);
        }
    }

    Ok(bundle)
}

pub async fn run(options: ExportOptions, client: &CkanClient) -> Result<()> {
    let ids = options
        .datasets
        .iter()
        .map(|d| super::extract_dataset_id(d))
        .collect::<Result<Vec<_>>>()?;

    let bundle = export_metadata_data(client, &ids, &options.format, !options.no_resources).await?;

    if bundle.datasets.is_empty() {
        eprintln!(
            "{}",
            format!("Nothing exported for format '{}'", options.format).yellow()
        );
    }

    // Exports are always machine readable
    super::output_json(&bundle)
}
