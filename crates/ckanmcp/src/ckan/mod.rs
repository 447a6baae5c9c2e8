pub mod analytics;
pub mod client;
pub mod export;
pub mod list;
pub mod org;
pub mod preview;
pub mod quality;
pub mod related;
pub mod resource;
pub mod search;
pub mod show;

use std::time::Duration;

use colored::Colorize;
use regex::Regex;

use crate::prelude::{println, *};
pub use client::{CkanClient, ClientConfig};

/// Portal used by the explorer when no URL is configured
pub const DEFAULT_PORTAL_URL: &str = "https://api.cloud.portaljs.com";

/// Explorer app - root command
#[derive(Debug, clap::Parser)]
#[command(name = "explore")]
#[command(about = "Explore a CKAN portal from the terminal")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Search for datasets
    #[clap(name = "search")]
    Search(search::SearchOptions),

    /// Show detailed dataset information
    #[clap(name = "show")]
    Show(show::ShowOptions),

    /// Show a resource and optionally download it
    #[clap(name = "resource")]
    Resource(resource::ResourceOptions),

    /// Show an organization and its datasets
    #[clap(name = "org")]
    Org(org::OrgOptions),

    /// List packages, organizations or tags
    #[clap(name = "list")]
    List(list::ListOptions),

    /// Show portal statistics
    #[clap(name = "stats")]
    Stats(analytics::StatsOptions),

    /// Show the datasets of your organization
    #[clap(name = "my")]
    My(org::MyOptions),

    /// Find datasets related to a dataset
    #[clap(name = "related")]
    Related(related::RelatedOptions),

    /// Score the metadata quality of a dataset
    #[clap(name = "quality")]
    Quality(quality::QualityOptions),

    /// Usage analytics for a dataset or the whole portal
    #[clap(name = "analytics")]
    Analytics(analytics::AnalyticsOptions),

    /// Preview the rows of a resource
    #[clap(name = "preview")]
    Preview(preview::PreviewOptions),

    /// Export dataset metadata as DCAT, Schema.org or raw CKAN
    #[clap(name = "export")]
    Export(export::ExportOptions),
}

/// Build the client configuration from the global flags
///
/// `default_url` is used when neither `--ckan-url` nor `CKAN_URL` is set.
pub fn client_config(global: &crate::Global, default_url: Option<&str>) -> Result<ClientConfig> {
    let base_url = global
        .ckan_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .or(default_url)
        .ok_or_else(|| eyre!("CKAN_URL environment variable is required"))?;

    Ok(ClientConfig::new(base_url)
        .with_api_key(global.api_key.clone())
        .with_cache_ttl(Duration::from_secs(global.cache_ttl)))
}

/// Accept a dataset id, a dataset name or a portal dataset URL
pub fn extract_dataset_id(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(eyre!("Dataset id cannot be empty"));
    }

    let re = Regex::new(r"/dataset/([^/?#]+)").map_err(|e| eyre!("Invalid pattern: {e}"))?;
    match re.captures(input).and_then(|caps| caps.get(1)) {
        Some(name) => Ok(name.as_str().to_string()),
        None => Ok(input.to_string()),
    }
}

/// Print any serializable value as pretty JSON
pub fn output_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| eyre!("JSON serialization failed: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Section header used by the formatted explorer output
pub fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60).bright_cyan());
    println!("{}", title.bright_cyan().bold());
    println!("{}", "=".repeat(60).bright_cyan());
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = client_config(&global, Some(DEFAULT_PORTAL_URL))?;
    let client = CkanClient::new(config)?;

    if global.verbose {
        println!("Connected to: {}", client.base_url());
        println!("{}", "-".repeat(60));
    }

    let result = match app.command {
        Commands::Search(options) => search::run(options, &client).await,
        Commands::Show(options) => show::run(options, &client).await,
        Commands::Resource(options) => resource::run(options, &client).await,
        Commands::Org(options) => org::run(options, &client).await,
        Commands::List(options) => list::run(options, &client).await,
        Commands::Stats(options) => analytics::run_stats(options, &client).await,
        Commands::My(options) => org::run_my(options, &client).await,
        Commands::Related(options) => related::run(options, &client).await,
        Commands::Quality(options) => quality::run(options, &client).await,
        Commands::Analytics(options) => analytics::run(options, &client).await,
        Commands::Preview(options) => preview::run(options, &client).await,
        Commands::Export(options) => export::run(options, &client).await,
    };

    client.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(ckan_url: Option<&str>) -> crate::Global {
        crate::Global {
            ckan_url: ckan_url.map(String::from),
            api_key: Some(String::new()),
            cache_ttl: 60,
            verbose: false,
        }
    }

    #[test]
    fn test_extract_dataset_id() {
        assert_eq!(extract_dataset_id("roads").unwrap(), "roads");
        assert_eq!(
            extract_dataset_id("https://portal.example.org/dataset/roads-2024").unwrap(),
            "roads-2024"
        );
        assert_eq!(
            extract_dataset_id("https://portal.example.org/@city/dataset/roads?x=1").unwrap(),
            "roads"
        );
        assert!(extract_dataset_id("  ").is_err());
    }

    #[test]
    fn test_client_config_from_global() {
        let config = client_config(&global(Some("https://data.example.org/")), None).unwrap();
        assert_eq!(config.base_url, "https://data.example.org");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_client_config_fallback_and_missing_url() {
        let config = client_config(&global(None), Some(DEFAULT_PORTAL_URL)).unwrap();
        assert_eq!(config.base_url, DEFAULT_PORTAL_URL);

        let err = client_config(&global(None), None).unwrap_err();
        assert!(err.to_string().contains("CKAN_URL"));
    }
}
