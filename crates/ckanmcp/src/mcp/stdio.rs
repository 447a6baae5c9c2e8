use std::sync::Arc;

use crate::prelude::{eprintln, *};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::ServerState;

pub async fn run_stdio(state: Arc<ServerState>) -> Result<()> {
    let verbose = state.global.verbose;
    if verbose {
        eprintln!(
            "Starting CKAN MCP server with stdio transport for {}...",
            state.client.base_url()
        );
        eprintln!();
    }

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if verbose {
            eprintln!("Received: {trimmed}");
        }

        let response = super::handle_request(trimmed, &state).await;
        let response_json = serde_json::to_string(&response)?;

        if verbose {
            eprintln!("Sending: {response_json}");
        }

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    debug!("stdin closed, stopping stdio transport");
    Ok(())
}
