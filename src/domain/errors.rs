use thiserror::Error;

/// Failure reported by one of the external services the explorer reads from.
///
/// Cloneable so a single failure can be delivered to every subscriber of a shared stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Request to {service} failed: {message}")]
    RequestFailed {
        service: &'static str,
        message: String,
    },
    #[error("Unexpected response from {service}: {message}")]
    UnexpectedResponse {
        service: &'static str,
        message: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("Invalid account name: {0:?}")]
    InvalidAccountName(String),
    #[error("Contract table {0} declares no key names")]
    MissingTableKey(String),
    #[error("Collaborator fetch failed: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Account view closed before {0} was emitted")]
    StreamClosed(&'static str),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    FailedToRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config")]
    FailedToParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
