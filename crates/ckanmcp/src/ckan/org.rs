use ckanmcp_core::package::Package;
use ckanmcp_core::query::QueryParams;
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use crate::prelude::{println, *};

/// Organization the `my` command looks at by default
pub const DEFAULT_MY_ORGANIZATION: &str = "abeelha";

/// Datasets listed under an organization before truncating
const ORG_DATASETS_SHOWN: usize = 20;

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrgOptions {
    /// Organization id or name
    pub org_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct MyOptions {
    /// Your organization
    #[arg(default_value = DEFAULT_MY_ORGANIZATION)]
    pub org: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// The parts of `organization_show` the explorer renders
#[derive(Debug, Deserialize, Default)]
struct OrganizationDetail {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    package_count: Option<u64>,
    #[serde(default)]
    packages: Option<Vec<Value>>,
}

/// `organization_show`, optionally with the organization's datasets
pub async fn organization_show_data(
    client: &CkanClient,
    id: &str,
    include_datasets: bool,
) -> Result<Value, Error> {
    let params = QueryParams::new()
        .with("id", id)
        .with("include_datasets", include_datasets);
    client.get_action("organization_show", &params).await
}

pub async fn run(options: OrgOptions, client: &CkanClient) -> Result<()> {
    let result = organization_show_data(client, &options.org_id, true).await?;

    if options.json {
        return super::output_json(&result);
    }

    let org: OrganizationDetail = decode(&result)?;
    let heading = org.title.as_deref().or(org.name.as_deref()).unwrap_or("Unknown");
    super::print_header(&format!("ORGANIZATION: {heading}"));

    let description: String = org
        .description
        .as_deref()
        .unwrap_or("N/A")
        .chars()
        .take(200)
        .collect();

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Display Name".bold().cyan(),
        or_na(org.display_name.as_deref())
    ]);
    table.add_row(prettytable::row!["Description".bold().cyan(), description]);
    table.add_row(prettytable::row![
        "Created".bold().cyan(),
        prefix(org.created.as_deref(), 10)
    ]);
    table.add_row(prettytable::row![
        "Package Count".bold().cyan(),
        org.package_count.unwrap_or(0)
    ]);
    table.printstd();

    let packages = org.packages.unwrap_or_default();
    if !packages.is_empty() {
        println!(
            "\n{}",
            format!("Datasets ({}):", packages.len()).bright_yellow().bold()
        );
        for (idx, raw) in packages.iter().take(ORG_DATASETS_SHOWN).enumerate() {
            let package: Package = decode(raw)?;
            println!("  {}. {}", idx + 1, package.display_title());
        }
    }

    Ok(())
}

pub async fn run_my(options: MyOptions, client: &CkanClient) -> Result<()> {
    let result = match organization_show_data(client, &options.org, true).await {
        Ok(result) => result,
        Err(e) => {
            warn!("organization_show failed for {}: {e}", options.org);
            println!(
                "{}",
                format!("Organization '{}' not found or no access", options.org).yellow()
            );
            return Ok(());
        }
    };

    let org: OrganizationDetail = decode(&result)?;
    let packages = org.packages.unwrap_or_default();

    if options.json {
        return super::output_json(&packages);
    }

    println!("Your datasets (org: {}):", options.org.cyan());

    if packages.is_empty() {
        println!("{}", "No datasets found in this organization".yellow());
        return Ok(());
    }

    println!("\nFound {} datasets in '{}':\n", packages.len(), options.org);
    for (idx, raw) in packages.iter().enumerate() {
        let package: Package = decode(raw)?;
        println!(
            "{} {}",
            format!("{}.", idx + 1).yellow().bold(),
            package.display_title().white().bold()
        );
        println!("   {}: {}", "Name".green(), or_na(package.name.as_deref()));
        println!(
            "   {}: {} files",
            "Resources".green(),
            package.resources.len()
        );
        println!(
            "   {}: {}",
            "Modified".green(),
            prefix(package.metadata_modified.as_deref(), 10).bright_black()
        );
        println!();
    }

    Ok(())
}
