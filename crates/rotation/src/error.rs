use std::error::Error as StdError;

/// Boxed source error coming back from a platform collaborator.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Crate-wide result type for rotation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed failures of a single rotation cycle.
///
/// A failed cycle only affects its own channel; the caller logs it and waits
/// for the next scheduled firing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No active member passes the channel's inclusion/exclusion rules.
    #[error("no eligible rotators in #{channel}")]
    NoEligibleRotators { channel: String },

    /// The platform does not know a channel with this name.
    #[error("channel #{channel} not found")]
    ChannelNotFound { channel: String },

    /// The bot must be in the channel to change its topic.
    #[error("bot is not a member of #{channel}")]
    NotAMember { channel: String },

    /// The channel has no rotation rules registered with the service.
    #[error("no rotation configured for #{channel}")]
    UnknownChannel { channel: String },

    /// A topic or message template is unusable.
    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("membership fetch failed: {context}: {source}")]
    MembershipFetchFailed {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("presence fetch failed: {context}: {source}")]
    PresenceFetchFailed {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("topic update failed: {context}: {source}")]
    TopicUpdateFailed {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("message post failed: {context}: {source}")]
    MessagePostFailed {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    #[must_use]
    pub fn no_eligible_rotators(channel: impl Into<String>) -> Self {
        Self::NoEligibleRotators {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn channel_not_found(channel: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn not_a_member(channel: impl Into<String>) -> Self {
        Self::NotAMember {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn unknown_channel(channel: impl Into<String>) -> Self {
        Self::UnknownChannel {
            channel: channel.into(),
        }
    }

    #[must_use]
    pub fn invalid_template(template: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn membership_fetch(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::MembershipFetchFailed {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn presence_fetch(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::PresenceFetchFailed {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn topic_update(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::TopicUpdateFailed {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn message_post(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::MessagePostFailed {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether the failure came from a platform collaborator rather than from
    /// the channel's own state.
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::MembershipFetchFailed { .. }
                | Self::PresenceFetchFailed { .. }
                | Self::TopicUpdateFailed { .. }
                | Self::MessagePostFailed { .. }
        )
    }
}
