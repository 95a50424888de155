//! Snapshot types fetched from the chat platform each cycle.

use serde::{Deserialize, Serialize};

/// Presence state of a channel member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Active,
    Inactive,
}

impl Presence {
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// Read-only channel snapshot. Never mutated by the rotation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Current topic text, empty when unset.
    pub topic: String,
    pub member_ids: Vec<String>,
    /// Whether the bot itself belongs to the channel.
    pub is_member: bool,
}

/// Identity of a member as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub id: String,
    pub name: String,
}

/// A member together with their presence at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub presence: Presence,
}

impl Member {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, presence: Presence) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            presence,
        }
    }

    pub(crate) fn from_profile(profile: MemberProfile, presence: Presence) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            presence,
        }
    }
}

/// Where the change announcement goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyTarget {
    /// Post into the rotated channel.
    #[default]
    Channel,
    /// Send a direct message to the new rotator.
    Direct,
}
