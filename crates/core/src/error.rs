use pview_types::TypesError;

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid value: {0}")]
    Types(#[from] TypesError),
    #[error("page length {0} is not one of the configured options")]
    UnsupportedPageLength(u32),
    #[error("failed to dispatch action: {0}")]
    Dispatch(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("fetch payload for {fetch_type} does not match the expected shape: {message}")]
    Payload { fetch_type: String, message: String },
    #[error("failed to serialize action: {0}")]
    Serialization(serde_json::Error),
}

pub type ListResult<T> = std::result::Result<T, ListError>;
