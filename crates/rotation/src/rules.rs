//! Static per-channel rotation rules.

use std::collections::BTreeSet;

use crate::{
    Result,
    template::Template,
    topic::TopicMutator,
    types::{Member, NotifyTarget},
};

/// Who may rotate in a channel and how the change is announced.
///
/// Built once from configuration; unchanged for the life of the process.
#[derive(Debug, Clone)]
pub struct RotatorRules {
    /// When non-empty, only these names are eligible.
    pub included: BTreeSet<String>,
    /// Never eligible, even when also included.
    pub excluded: BTreeSet<String>,
    pub topic: TopicMutator,
    /// Rendered with (rotator name, channel name).
    pub message: Template,
    pub notify: NotifyTarget,
}

impl RotatorRules {
    /// Validates both templates: the topic pattern needs exactly one slot and
    /// the message pattern one or two.
    pub fn new(topic_pattern: &str, message_pattern: &str) -> Result<Self> {
        Ok(Self {
            included: BTreeSet::new(),
            excluded: BTreeSet::new(),
            topic: TopicMutator::new(topic_pattern)?,
            message: Template::parse_with_slots(message_pattern, 1, 2)?,
            notify: NotifyTarget::default(),
        })
    }

    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn notify(mut self, target: NotifyTarget) -> Self {
        self.notify = target;
        self
    }

    /// Name-based gate: inclusion first, then exclusion.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        if !self.included.is_empty() && !self.included.contains(name) {
            return false;
        }
        !self.excluded.contains(name)
    }

    /// Full eligibility: active presence plus the name gate.
    #[must_use]
    pub fn is_eligible(&self, member: &Member) -> bool {
        member.presence.is_active() && self.admits(&member.name)
    }

    #[must_use]
    pub fn render_message(&self, rotator: &str, channel: &str) -> String {
        self.message.render(&[rotator, channel])
    }
}
