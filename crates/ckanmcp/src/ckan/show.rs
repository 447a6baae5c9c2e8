use ckanmcp_core::package::Package;
use ckanmcp_core::query::QueryParams;
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ShowOptions {
    /// Dataset id, name or portal URL
    pub package: String,

    /// Show resource ids, dates and custom fields
    #[arg(short, long)]
    pub detailed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// `package_show` for one dataset
pub async fn package_show_data(client: &CkanClient, id: &str) -> Result<Value, Error> {
    client
        .get_action("package_show", &QueryParams::new().with("id", id))
        .await
}

/// Human readable byte count, `Unknown` when missing or zero
pub fn format_size(size: Option<&Value>) -> String {
    let bytes = match size {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        _ => None,
    };

    let Some(mut bytes) = bytes.filter(|b| *b > 0.0) else {
        return "Unknown".to_string();
    };

    for unit in ["B", "KB", "MB", "GB"] {
        if bytes < 1024.0 {
            return format!("{bytes:.2} {unit}");
        }
        bytes /= 1024.0;
    }
    format!("{bytes:.2} TB")
}

pub async fn run(options: ShowOptions, client: &CkanClient) -> Result<()> {
    let id = super::extract_dataset_id(&options.package)?;
    let result = package_show_data(client, &id).await?;

    if options.json {
        return super::output_json(&result);
    }

    let package: Package = decode(&result)?;
    display_package(&package, options.detailed);
    Ok(())
}

fn display_package(package: &Package, detailed: bool) {
    super::print_header(&format!("PACKAGE: {}", package.display_title()));

    let mut table = new_table();
    let organization = package.organization.as_ref().and_then(|o| o.title.as_deref());
    for (label, value) in [
        ("ID/Name", or_na(package.name.as_deref()).to_string()),
        ("Title", or_na(package.title.as_deref()).to_string()),
        ("Organization", or_na(organization).to_string()),
        ("Author", or_na(package.author.as_deref()).to_string()),
        ("Maintainer", or_na(package.maintainer.as_deref()).to_string()),
        ("License", or_na(package.license_title.as_deref()).to_string()),
        ("State", or_na(package.state.as_deref()).to_string()),
        ("Created", prefix(package.metadata_created.as_deref(), 10)),
        ("Modified", prefix(package.metadata_modified.as_deref(), 10)),
    ] {
        table.add_row(prettytable::row![label.bold().cyan(), value]);
    }
    table.printstd();

    if let Some(notes) = package.notes.as_deref().filter(|n| !n.is_empty()) {
        println!("\n{}", "Description:".bold());
        println!("  {}", notes.chars().take(500).collect::<String>());
    }

    if !package.tags.is_empty() {
        let tags: Vec<&str> = package
            .tags
            .iter()
            .filter_map(|t| t.display_name.as_deref().or(t.name.as_deref()))
            .collect();
        println!("\n{}: {}", "Tags".bold(), tags.join(", ").magenta());
    }

    if !package.resources.is_empty() {
        println!(
            "\n{}",
            format!("RESOURCES ({} files):", package.resources.len()).bright_yellow().bold()
        );
        println!("{}", "-".repeat(40));

        for (idx, resource) in package.resources.iter().enumerate() {
            println!("\n  {}", format!("Resource {}:", idx + 1).bold());
            println!(
                "    Name: {}",
                or_na(resource.name.as_deref().or(resource.url.as_deref()))
            );
            println!("    Format: {}", or_na(resource.format.as_deref()));
            println!("    Size: {}", format_size(resource.size.as_ref()));
            println!("    URL: {}", or_na(resource.url.as_deref()).cyan().underline());
            if let Some(description) = resource.description.as_deref().filter(|d| !d.is_empty()) {
                println!(
                    "    Description: {}",
                    description.chars().take(200).collect::<String>()
                );
            }
            if detailed {
                println!("    ID: {}", or_na(resource.id.as_deref()));
                println!("    Created: {}", prefix(resource.created.as_deref(), 10));
                println!("    Modified: {}", prefix(resource.last_modified.as_deref(), 10));
            }
        }
    }

    if detailed && !package.extras.is_empty() {
        println!("\n{}", "CUSTOM FIELDS:".bright_yellow().bold());
        println!("{}", "-".repeat(40));
        for extra in &package.extras {
            let value = extra
                .value
                .as_ref()
                .map(ckanmcp_core::query::value_text)
                .unwrap_or_else(|| "N/A".to_string());
            println!("  {}: {}", or_na(extra.key.as_deref()), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "Unknown");
        assert_eq!(format_size(Some(&json!(0))), "Unknown");
        assert_eq!(format_size(Some(&json!(512))), "512.00 B");
        assert_eq!(format_size(Some(&json!(2048))), "2.00 KB");
        assert_eq!(format_size(Some(&json!("1048576"))), "1.00 MB");
        assert_eq!(format_size(Some(&json!("n/a"))), "Unknown");
    }
}
