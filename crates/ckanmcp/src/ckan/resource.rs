use std::path::{Path, PathBuf};

use ckanmcp_core::package::Resource;
use ckanmcp_core::query::QueryParams;
use colored::Colorize;
use serde_json::Value;

use super::client::{decode, CkanClient};
use super::show::format_size;
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ResourceOptions {
    /// Resource id
    pub resource_id: String,

    /// Download the resource file to this path
    #[arg(short, long, value_name = "FILE")]
    pub download: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// `resource_show` for one resource
pub async fn resource_show_data(client: &CkanClient, id: &str) -> Result<Value, Error> {
    client
        .get_action("resource_show", &QueryParams::new().with("id", id))
        .await
}

/// Fetch a resource file and write it to `destination`
///
/// Plain GET outside the portal session and its cache; any non-2xx status
/// fails. Returns the number of bytes written.
pub async fn download_resource(url: &str, destination: &Path) -> Result<usize, Error> {
    let http = reqwest::Client::builder()
        .use_rustls_tls()
        .build()
        .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::DownloadFailed(status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    tokio::fs::write(destination, &bytes).await?;
    Ok(bytes.len())
}

pub async fn run(options: ResourceOptions, client: &CkanClient) -> Result<()> {
    let result = resource_show_data(client, &options.resource_id).await?;
    let resource: Resource = decode(&result)?;

    if options.json {
        super::output_json(&result)?;
    } else {
        super::print_header(&format!("RESOURCE: {}", or_na(resource.name.as_deref())));

        let mut table = new_table();
        for (label, value) in [
            ("Format", or_na(resource.format.as_deref()).to_string()),
            ("Size", format_size(resource.size.as_ref())),
            ("URL", or_na(resource.url.as_deref()).to_string()),
            ("Package", or_na(resource.package_id.as_deref()).to_string()),
            ("Created", prefix(resource.created.as_deref(), 19)),
            ("Modified", prefix(resource.last_modified.as_deref(), 19)),
        ] {
            table.add_row(prettytable::row![label.bold().cyan(), value]);
        }
        table.printstd();
    }

    let Some(destination) = options.download else {
        return Ok(());
    };

    let Some(url) = resource.url.as_deref().filter(|u| !u.is_empty()) else {
        return Err(eyre!("Resource {} has no URL to download", options.resource_id));
    };

    println!("\nDownloading to: {}", destination.display().to_string().cyan());
    let written = download_resource(url, &destination).await?;
    println!("{} ({written} bytes)", "Download complete!".green().bold());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/counts.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("counts.csv");

        let written = download_resource(&format!("{}/files/counts.csv", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_download_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing.csv");

        let err = download_resource(&format!("{}/missing.csv", server.uri()), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed(404)));
        assert!(!destination.exists());
    }
}
