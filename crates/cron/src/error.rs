use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("no rotation job for channel: {channel}")]
    JobNotFound { channel: String },

    #[error("rotation for {channel} is already running")]
    AlreadyRunning { channel: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_cron(expr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidCron {
            expr: expr.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn job_not_found(channel: impl Into<String>) -> Self {
        Self::JobNotFound {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn already_running(channel: impl Into<String>) -> Self {
        Self::AlreadyRunning {
            channel: channel.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
