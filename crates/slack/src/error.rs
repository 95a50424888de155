use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Slack answered with `"ok": false`.
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },

    #[error("slack {method} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        status: u16,
        body: String,
    },

    #[error("slack {method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("slack {method} returned an unexpected body: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    #[must_use]
    pub fn api(method: &'static str, error: impl Into<String>) -> Self {
        Self::Api {
            method,
            error: error.into(),
        }
    }

    #[must_use]
    pub fn http(method: &'static str, source: reqwest::Error) -> Self {
        Self::Http { method, source }
    }

    /// The Slack error code (`channel_not_found`, `ratelimited`, ...), if any.
    #[must_use]
    pub fn api_error(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
