//! In-memory platform. No network — for tests and dry runs.

use std::{collections::HashMap, sync::Mutex};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
};

use crate::{
    provider::{MembershipProvider, Notifier},
    types::{Channel, MemberProfile, Presence},
};

/// A message recorded by [`InMemoryWorkspace::post_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub target: String,
    pub text: String,
}

/// Channels and members held in maps; topic changes apply to the stored
/// channel so consecutive cycles see them.
#[derive(Default)]
pub struct InMemoryWorkspace {
    channels: Mutex<Vec<Channel>>,
    members: Mutex<HashMap<String, (String, Presence)>>,
    posted: Mutex<Vec<PostedMessage>>,
    failing: Mutex<Vec<&'static str>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, id: &str, name: &str, presence: Presence) {
        let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        members.insert(id.to_string(), (name.to_string(), presence));
    }

    pub fn set_presence(&self, id: &str, presence: Presence) {
        let mut members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = members.get_mut(id) {
            entry.1 = presence;
        }
    }

    pub fn add_channel(&self, channel: Channel) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.push(channel);
    }

    /// Make the named operation fail until cleared. Names match the trait
    /// method names, e.g. `"set_topic"`.
    pub fn fail(&self, operation: &'static str) {
        let mut failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        failing.push(operation);
    }

    pub fn clear_failures(&self) {
        let mut failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        failing.clear();
    }

    pub fn topic(&self, channel_id: &str) -> Option<String> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| c.topic.clone())
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&operation) {
            bail!("{operation} unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipProvider for InMemoryWorkspace {
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        self.check("list_channels")?;
        Ok(self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn get_member(&self, member_id: &str) -> Result<MemberProfile> {
        self.check("get_member")?;
        let members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        match members.get(member_id) {
            Some((name, _)) => Ok(MemberProfile {
                id: member_id.to_string(),
                name: name.clone(),
            }),
            None => bail!("user not found: {member_id}"),
        }
    }

    async fn get_presence(&self, member_id: &str) -> Result<Presence> {
        self.check("get_presence")?;
        let members = self.members.lock().unwrap_or_else(|e| e.into_inner());
        match members.get(member_id) {
            Some((_, presence)) => Ok(*presence),
            None => bail!("user not found: {member_id}"),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryWorkspace {
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        self.check("set_topic")?;
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        match channels.iter_mut().find(|c| c.id == channel_id) {
            Some(channel) => {
                channel.topic = topic.to_string();
                Ok(())
            },
            None => bail!("channel not found: {channel_id}"),
        }
    }

    async fn post_message(&self, target: &str, text: &str) -> Result<()> {
        self.check("post_message")?;
        let mut posted = self.posted.lock().unwrap_or_else(|e| e.into_inner());
        posted.push(PostedMessage {
            target: target.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_topic_updates_stored_channel() {
        let ws = InMemoryWorkspace::new();
        ws.add_channel(Channel {
            id: "C1".into(),
            name: "ops".into(),
            topic: String::new(),
            member_ids: vec![],
            is_member: true,
        });
        ws.set_topic("C1", "POC: alice").await.unwrap();
        assert_eq!(ws.topic("C1").as_deref(), Some("POC: alice"));
        assert!(ws.set_topic("C2", "x").await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let ws = InMemoryWorkspace::new();
        ws.fail("post_message");
        assert!(ws.post_message("ops", "hi").await.is_err());
        ws.clear_failures();
        ws.post_message("ops", "hi").await.unwrap();
        assert_eq!(ws.posted().len(), 1);
    }
}
