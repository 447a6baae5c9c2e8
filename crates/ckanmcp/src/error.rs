#[derive(thiserror::Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The portal answered `success: false`; its error payload is kept verbatim
    #[error("CKAN API Error: {0}")]
    CkanApi(serde_json::Value),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed portal response: {0}")]
    MalformedResponse(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Download failed with HTTP {0}")]
    DownloadFailed(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl From<ckanmcp_core::query::QueryError> for Error {
    fn from(err: ckanmcp_core::query::QueryError) -> Self {
        Error::InvalidParameters(err.to_string())
    }
}
