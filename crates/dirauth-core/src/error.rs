//! Error types for Dirauth

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Directory Errors
    #[error("Failed to connect to directory server: {0}")]
    Network(String),

    #[error("Directory rejected the user bind")]
    InvalidCredentials,

    #[error("Directory rejected the service account bind")]
    ServiceBindRejected,

    #[error("Directory search failed: {0}")]
    Search(String),

    #[error("Directory session misuse: {0}")]
    Session(String),

    // Request Errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Route not found")]
    NotFound,

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Internal Errors
    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Network(_) => "NetworkError",
            Error::InvalidCredentials => "InvalidCredentials",
            Error::ServiceBindRejected => "ServiceBindRejected",
            Error::Search(_) => "SearchError",
            Error::Session(_) => "InternalError",
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::NotFound => "NotFound",
            Error::Config(_) => "InvalidConfiguration",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,

            Error::InvalidCredentials | Error::ServiceBindRejected => 401,

            Error::NotFound => 404,

            _ => 500,
        }
    }

    /// Message shown to API callers. Details stay in the `Display` output,
    /// which only goes to the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::Network(_) => "Network Error!",
            Error::InvalidCredentials => "Username or Password Error!",
            Error::ServiceBindRejected => "Password Error!",
            Error::InvalidRequest(_) => "Request Data invalid",
            Error::NotFound => "Not Found.",
            _ => "Server Error!",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }
}
