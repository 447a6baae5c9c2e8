use crate::prelude::*;
use clap::Parser;

mod ckan;
mod error;
mod mcp;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "MCP server and data explorer for CKAN open-data portals"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Base URL of the CKAN portal
    #[clap(long, env = "CKAN_URL", global = true)]
    ckan_url: Option<String>,

    /// Static API key sent as the Authorization header
    #[clap(long, env = "CKAN_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Seconds a cached portal response stays fresh
    #[clap(long, env = "CKAN_CACHE_TTL", global = true, default_value = "300")]
    cache_ttl: u64,

    /// Whether to display additional information.
    #[clap(long, env = "CKAN_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Explore a CKAN portal from the terminal
    Explore(crate::ckan::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Explore(sub_app) => crate::ckan::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
