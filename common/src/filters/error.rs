use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("Unknown filter column: {0}")]
    UnknownField(String),
    #[error("Failed to fetch {entity}")]
    FetchFailed {
        entity: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ListError {
    /// HTTP status the list endpoints answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownField(_) => 400,
            Self::FetchFailed { .. } => 500,
        }
    }
}
