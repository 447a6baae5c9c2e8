use ckanmcp_core::package::{Package, PackageSearchResult};
use ckanmcp_core::related::{exclude_source, related_search_params, RelationType};
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use super::show::package_show_data;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct RelatedOptions {
    /// Dataset id, name or portal URL
    pub dataset: String,

    /// Relationship: tags, organization or theme
    #[arg(short, long, default_value = "tags")]
    pub relation: RelationType,

    /// Maximum number of related datasets
    #[arg(short = 'n', long, default_value = "10")]
    pub max_results: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Datasets related to `dataset_id`, in portal search order
///
/// The source dataset is fetched first; when it has nothing to relate on no
/// search is issued and the result is empty.
pub async fn related_datasets_data(
    client: &CkanClient,
    dataset_id: &str,
    relation: RelationType,
    max_results: usize,
) -> Result<Vec<Value>, Error> {
    let raw = package_show_data(client, dataset_id).await?;
    let source: Package = decode(&raw)?;

    let Some(params) = related_search_params(&source, relation, max_results) else {
        debug!("{dataset_id} has nothing to relate on by {relation:?}");
        return Ok(Vec::new());
    };

    let found: PackageSearchResult = decode(&client.get_action("package_search", &params).await?)?;

    let mut source_ids = vec![dataset_id];
    if let Some(id) = source.id.as_deref() {
        source_ids.push(id);
    }

    Ok(exclude_source(found.results, &source_ids, max_results))
}

pub async fn run(options: RelatedOptions, client: &CkanClient) -> Result<()> {
    let id = super::extract_dataset_id(&options.dataset)?;
    let related = related_datasets_data(client, &id, options.relation, options.max_results).await?;

    if options.json {
        return super::output_json(&related);
    }

    println!(
        "Datasets related to {} by {:?}:\n",
        id.bright_white().bold(),
        options.relation
    );

    if related.is_empty() {
        println!("{}", "No related datasets found".yellow());
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["#", "Name", "Title", "Organization"]);
    for (idx, raw) in related.iter().enumerate() {
        let package: Package = decode(raw)?;
        table.add_row(prettytable::row![
            idx + 1,
            or_na(package.name.as_deref()),
            package.display_title(),
            or_na(package.organization_name())
        ]);
    }
    table.printstd();

    Ok(())
}
