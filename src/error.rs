use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Required tool not found: {0}")]
    MissingTool(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed repository URL: {0}")]
    MalformedUrl(String),

    #[error("GitHub CLI error: {0}")]
    GitHubCli(String),

    #[error("Packaging failed for {0}")]
    Packaging(String),

    #[error("Model rate limited after all retries")]
    ModelUnavailable,

    #[error("Model invocation failed: {0}")]
    ModelFailed(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Packaging(_) => 2,
            _ => 1,
        }
    }
}
