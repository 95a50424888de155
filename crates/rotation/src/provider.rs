//! Traits for the chat platform the rotation runs against.

use {anyhow::Result, async_trait::async_trait};

use crate::types::{Channel, MemberProfile, Presence};

/// Read side of the chat platform: channels, members and presence.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// All channels visible to the bot, with member ids and topic.
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    async fn get_member(&self, member_id: &str) -> Result<MemberProfile>;

    async fn get_presence(&self, member_id: &str) -> Result<Presence>;
}

/// Write side of the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()>;

    /// Post `text` to a channel name or, for direct messages, a member id.
    async fn post_message(&self, target: &str, text: &str) -> Result<()>;
}
