//! Channel topic rewriting.

use regex::{NoExpand, Regex};

use crate::{Result, template::Template};

/// Separator placed between existing topic text and an appended mention.
pub const TOPIC_SEPARATOR: &str = " | ";

/// Rewrites a channel topic so it names the current rotator.
#[derive(Debug, Clone)]
pub struct TopicMutator {
    pattern: Template,
    detect: Regex,
}

impl TopicMutator {
    /// The pattern must contain exactly one `%s` slot.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Template::parse_with_slots(pattern, 1, 1)?;
        let detect = pattern.detection_regex()?;
        Ok(Self { pattern, detect })
    }

    #[must_use]
    pub fn pattern(&self) -> &Template {
        &self.pattern
    }

    /// The mention as it appears in the topic for `rotator`.
    #[must_use]
    pub fn mention(&self, rotator: &str) -> String {
        self.pattern.render(&[rotator])
    }

    /// Replace the first existing mention in place, otherwise append one.
    /// Text around the mention is left untouched.
    #[must_use]
    pub fn compute(&self, current: &str, rotator: &str) -> String {
        let mention = self.mention(rotator);
        if self.detect.is_match(current) {
            self.detect.replace(current, NoExpand(&mention)).into_owned()
        } else if !current.is_empty() {
            format!("{current}{TOPIC_SEPARATOR}{mention}")
        } else {
            mention
        }
    }
}

/// One-shot form of [`TopicMutator::compute`].
pub fn compute_topic(current: &str, rotator: &str, pattern: &str) -> Result<String> {
    Ok(TopicMutator::new(pattern)?.compute(current, rotator))
}
