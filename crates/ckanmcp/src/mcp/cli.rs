#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Model Context Protocol server exposing CKAN tools")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve JSON-RPC over stdin/stdout, one message per line
    #[clap(name = "stdio")]
    Stdio,

    /// Serve JSON-RPC over HTTP with an SSE readiness stream
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "CKAN_MCP_PORT", default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "CKAN_MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,
}
