use thiserror::Error;

/// # Errors produced by the REST client.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be sent or the response body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `detail` field of the error body, or the raw body when absent.
        detail: String,
    },

    /// The response body is not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request path could not be built from the base URL.
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiError::Http(_) => "api_http",
            ApiError::Status { .. } => "api_status",
            ApiError::Decode(_) => "api_decode",
            ApiError::Url(_) => "api_url",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ApiError::Http(e) => format!("http: {e}"),
            ApiError::Status { status, detail } => format!("{status}: {detail}"),
            ApiError::Decode(e) => format!("decode: {e}"),
            ApiError::Url(e) => format!("url: {e}"),
        }
    }

    /// HTTP status of the failed call, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
