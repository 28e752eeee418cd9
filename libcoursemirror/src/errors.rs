use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmError {
    /// Parameter is path to the output directory
    #[error("the output directory {0} already exists. Remove it or pick another destination.")]
    DestinationExists(String),
    #[error("error creating directory {path}. {message}")]
    ErrorCreatingDirectory { path: String, message: String },
    /// parameters are file path, additional error message
    #[error("{message} : {file_name}")]
    FileOperationError { file_name: String, message: String },
    #[error("error connecting to {url}. {message}")]
    NetworkError { url: String, message: String },
    #[error("failed to build http client. {0}")]
    HttpClient(String),
    #[error("Invalid url received : {0}")]
    InvalidUrl(String),
    #[error("Invalid cookie received : {0}. Expected NAME=VALUE")]
    InvalidCookie(String),
    #[error("error reading cookie cache {path}. {message}")]
    CookieCache { path: String, message: String },
    /// Parameter is the host that needs a signed-in session
    #[error("{0} requires a signed-in session but no cookies were found for it")]
    AuthenticationRequired(String),
}

pub type Result<T> = std::result::Result<T, CmError>;
