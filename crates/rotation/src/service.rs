//! One rotation cycle per call: fetch, select, retopic, announce.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use {
    rand::{SeedableRng, rngs::StdRng},
    tracing::{debug, info},
};

use crate::{
    Error, Result,
    history::RotationHistory,
    provider::{MembershipProvider, Notifier},
    rules::RotatorRules,
    selector::select_rotator,
    types::{Channel, Member, NotifyTarget},
};

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    pub channel: String,
    pub rotator: String,
    /// Shuffled candidate order the rotator was taken from.
    pub order: Vec<String>,
    pub topic: String,
    pub replenished: bool,
}

/// Drives rotation cycles for a fixed set of channels.
///
/// Owns the per-channel histories. Cycles for different channels may run
/// concurrently; the history map is never locked across an `.await`. A cycle
/// that fails leaves its channel's history as it was.
pub struct RotationService {
    provider: Arc<dyn MembershipProvider>,
    notifier: Arc<dyn Notifier>,
    rules: HashMap<String, RotatorRules>,
    histories: Mutex<HashMap<String, RotationHistory>>,
    rng: Mutex<StdRng>,
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

impl RotationService {
    /// Create a service whose RNG is seeded from the current time.
    pub fn new(
        provider: Arc<dyn MembershipProvider>,
        notifier: Arc<dyn Notifier>,
        rules: HashMap<String, RotatorRules>,
    ) -> Self {
        Self::with_seed(provider, notifier, rules, time_seed())
    }

    /// Create a service with a fixed RNG seed. Same seed and same inputs give
    /// the same rotators.
    pub fn with_seed(
        provider: Arc<dyn MembershipProvider>,
        notifier: Arc<dyn Notifier>,
        rules: HashMap<String, RotatorRules>,
        seed: u64,
    ) -> Self {
        Self {
            provider,
            notifier,
            rules,
            histories: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Names of the configured channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of a channel's current history.
    pub fn history(&self, channel: &str) -> RotationHistory {
        let histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        histories.get(channel).cloned().unwrap_or_default()
    }

    /// Run one rotation cycle for `channel_name`.
    pub async fn rotate(&self, channel_name: &str) -> Result<RotationOutcome> {
        let rules = self
            .rules
            .get(channel_name)
            .ok_or_else(|| Error::unknown_channel(channel_name))?;

        let channel = self.find_channel(channel_name).await?;
        if !channel.is_member {
            return Err(Error::not_a_member(channel_name));
        }

        info!(channel = channel_name, "rotating POC");
        let members = self.fetch_members(&channel).await?;

        // Selection runs on a copy; the copy replaces the stored history only
        // once the topic and message went out.
        let mut history = self.history(&channel.name);
        let selection = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            select_rotator(&channel.name, &members, rules, &mut history, &mut *rng)?
        };

        let topic = rules.topic.compute(&channel.topic, &selection.rotator);
        self.notifier
            .set_topic(&channel.id, &topic)
            .await
            .map_err(|e| Error::topic_update(format!("#{}", channel.name), e))?;

        let text = rules.render_message(&selection.rotator, &channel.name);
        let target = match rules.notify {
            NotifyTarget::Channel => channel.name.as_str(),
            NotifyTarget::Direct => members
                .iter()
                .find(|m| m.name == selection.rotator)
                .map_or(channel.name.as_str(), |m| m.id.as_str()),
        };
        self.notifier
            .post_message(target, &text)
            .await
            .map_err(|e| Error::message_post(target, e))?;

        self.histories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.name.clone(), history);

        info!(
            channel = channel_name,
            rotator = %selection.rotator,
            replenished = selection.replenished,
            "POC rotated"
        );

        Ok(RotationOutcome {
            channel: channel.name,
            rotator: selection.rotator,
            order: selection.order,
            topic,
            replenished: selection.replenished,
        })
    }

    async fn find_channel(&self, channel_name: &str) -> Result<Channel> {
        let channels = self
            .provider
            .list_channels()
            .await
            .map_err(|e| Error::membership_fetch("list channels", e))?;
        channels
            .into_iter()
            .find(|c| c.name == channel_name)
            .ok_or_else(|| Error::channel_not_found(channel_name))
    }

    async fn fetch_members(&self, channel: &Channel) -> Result<Vec<Member>> {
        let mut members = Vec::with_capacity(channel.member_ids.len());
        for id in &channel.member_ids {
            let profile = self
                .provider
                .get_member(id)
                .await
                .map_err(|e| Error::membership_fetch(format!("member {id}"), e))?;
            let presence = self
                .provider
                .get_presence(id)
                .await
                .map_err(|e| Error::presence_fetch(format!("member {id}"), e))?;
            members.push(Member::from_profile(profile, presence));
        }
        debug!(channel = %channel.name, count = members.len(), "fetched members");
        Ok(members)
    }
}
