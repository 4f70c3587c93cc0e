use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("No data returned from {0}")]
    Empty(String),

    #[error("Response is missing field {0}")]
    MissingField(&'static str),
}

pub type BackendResult<T> = Result<T, BackendError>;
