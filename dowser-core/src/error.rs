use thiserror::Error;

#[derive(Error, Debug)]
pub enum DowserError {
    #[error("HTTP client setup failed: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("Invalid output format: {0}")]
    InvalidFormat(String),

    #[error("Invalid redirect mode: {0}")]
    InvalidRedirectMode(String),
}

pub type Result<T> = std::result::Result<T, DowserError>;
