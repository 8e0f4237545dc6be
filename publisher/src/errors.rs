use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("{label} does not exist: {}", .path.display())]
    MissingCredentialFile { label: &'static str, path: PathBuf },

    #[error("TLS setup error: {0}")]
    Tls(String),

    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    #[error("Publish failed: {0}")]
    PublishFailure(String),

    #[error("Disconnect failed: {0}")]
    DisconnectFailure(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short name of the error variant, printed next to the message in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingConfiguration(_) => "MissingConfiguration",
            Error::MissingCredentialFile { .. } => "MissingCredentialFile",
            Error::Tls(_) => "Tls",
            Error::ConnectionFailure(_) => "ConnectionFailure",
            Error::PublishFailure(_) => "PublishFailure",
            Error::DisconnectFailure(_) => "DisconnectFailure",
            Error::Json(_) => "Json",
            Error::Io(_) => "Io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
