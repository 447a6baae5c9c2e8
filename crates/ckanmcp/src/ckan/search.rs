use ckanmcp_core::package::{Package, PackageSearchResult};
use ckanmcp_core::query::{build_search_query, explorer_filter, FacetedSearch, PackageSearch, MATCH_ALL};
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct SearchOptions {
    /// Search query
    #[arg(default_value = MATCH_ALL)]
    pub query: String,

    /// Number of results
    #[arg(short = 'n', long, default_value = "10")]
    pub rows: u64,

    /// Filter by organization
    #[arg(short, long)]
    pub org: Option<String>,

    /// Filter by tags (comma-separated)
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Plain `package_search`, forwarding only the supplied arguments
pub async fn package_search_data(client: &CkanClient, search: &PackageSearch) -> Result<Value, Error> {
    client.get_action("package_search", &search.to_params()).await
}

/// `package_search` with facets and filter, spatial and temporal constraints
pub async fn faceted_search_data(client: &CkanClient, search: &FacetedSearch) -> Result<Value, Error> {
    let params = build_search_query(search)?;
    client.get_action("package_search", &params).await
}

pub async fn run(options: SearchOptions, client: &CkanClient) -> Result<()> {
    let search = PackageSearch {
        q: Some(options.query.clone()),
        fq: explorer_filter(options.org.as_deref(), options.tags.as_deref()),
        rows: Some(options.rows),
        ..Default::default()
    };

    let result = package_search_data(client, &search).await?;

    if options.json {
        return super::output_json(&result);
    }

    let found: PackageSearchResult = decode(&result)?;

    println!("Searching for: '{}'", options.query.bright_white());
    if let Some(org) = &options.org {
        println!("   Organization filter: {}", org.cyan());
    }
    if let Some(tags) = &options.tags {
        println!("   Tags filter: {}", tags.cyan());
    }

    println!(
        "\nFound {} total results, showing {}:\n",
        found.count.to_string().bright_yellow().bold(),
        found.results.len()
    );

    for (idx, raw) in found.results.iter().enumerate() {
        let package: Package = decode(raw)?;
        println!(
            "{} {}",
            format!("{}.", idx + 1).yellow().bold(),
            package.display_title().white().bold()
        );
        println!("   {}: {}", "Name".green(), or_na(package.name.as_deref()));
        println!(
            "   {}: {}",
            "Org".green(),
            or_na(package.organization.as_ref().and_then(|o| o.title.as_deref()))
        );
        println!("   {}: {}", "Resources".green(), package.resources.len());
        println!(
            "   {}: {}",
            "Modified".green(),
            prefix(package.metadata_modified.as_deref(), 10).bright_black()
        );
        println!();
    }

    Ok(())
}
