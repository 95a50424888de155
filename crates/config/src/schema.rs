/// Config schema types (token, timezone, slack, channels).
use std::collections::{BTreeMap, BTreeSet};

use {
    pocmon_rotation::{NotifyTarget, RotatorRules},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Deserializer},
};

/// Default API root for the Slack Web API.
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Default topic pattern when a channel doesn't set one.
pub const DEFAULT_POC_MESSAGE_PATTERN: &str = "POC: %s";

/// Default announcement when a channel doesn't set one.
pub const DEFAULT_MESSAGE_POC_CHANGE: &str = "%s is now the POC for #%s";

/// Root configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct PocmonConfig {
    /// Bot token used to authenticate against the chat platform. Never
    /// written back out.
    pub token: Secret<String>,
    /// IANA time zone the rotation schedules are evaluated in.
    pub timezone: String,
    pub slack: SlackConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Default for PocmonConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            timezone: "UTC".into(),
            slack: SlackConfig::default(),
            channels: Vec::new(),
        }
    }
}

impl std::fmt::Debug for PocmonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PocmonConfig")
            .field("token", &"[REDACTED]")
            .field("timezone", &self.timezone)
            .field("slack", &self.slack)
            .field("channels", &self.channels)
            .finish()
    }
}

impl PocmonConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }

    /// Parsed [`timezone`](Self::timezone).
    pub fn tz(&self) -> crate::Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| crate::Error::message(format!("unknown timezone: {}", self.timezone)))
    }

    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enabled)
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name == name)
    }
}

/// Slack Web API client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// API root. Override to point at a proxy or a test server.
    pub api_base: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_SLACK_API_BASE.into(),
            timeout_secs: 30,
        }
    }
}

/// Rotation settings for one channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel name without the leading `#`.
    pub name: String,
    /// Cron expression (5, 6 or 7 fields).
    pub rotate_frequency: String,
    /// Topic mention template with one `%s` slot.
    pub poc_message_pattern: String,
    /// Announcement template: rotator name, then channel name.
    pub message_poc_change: String,
    /// When non-empty, only these names rotate.
    pub included_rotators: NameSet,
    /// Never rotate these names.
    pub excluded_rotators: NameSet,
    pub notify: NotifyTarget,
    pub enabled: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            rotate_frequency: String::new(),
            poc_message_pattern: DEFAULT_POC_MESSAGE_PATTERN.into(),
            message_poc_change: DEFAULT_MESSAGE_POC_CHANGE.into(),
            included_rotators: NameSet::default(),
            excluded_rotators: NameSet::default(),
            notify: NotifyTarget::default(),
            enabled: true,
        }
    }
}

impl ChannelConfig {
    /// Build the rotation rules, validating both templates.
    pub fn rules(&self) -> pocmon_rotation::Result<RotatorRules> {
        Ok(
            RotatorRules::new(&self.poc_message_pattern, &self.message_poc_change)?
                .include(self.included_rotators.iter())
                .exclude(self.excluded_rotators.iter())
                .notify(self.notify),
        )
    }
}

/// A set of member names.
///
/// Accepts a list (`["alice", "bob"]`) or a map of name to flag
/// (`{ alice = true, bob = false }`); names mapped to `false` are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameSet(pub BTreeSet<String>);

impl NameSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'de> Deserialize<'de> for NameSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Flags(BTreeMap<String, bool>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::List(names) => names.into_iter().collect(),
            Repr::Flags(flags) => flags
                .into_iter()
                .filter_map(|(name, on)| on.then_some(name))
                .collect(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_set_accepts_list_and_flags() {
        let list: NameSet = serde_json::from_str(r#"["alice", "bob"]"#).unwrap();
        assert!(list.contains("alice") && list.contains("bob"));

        let flags: NameSet = serde_json::from_str(r#"{"alice": true, "bob": false}"#).unwrap();
        assert!(flags.contains("alice"));
        assert!(!flags.contains("bob"));
    }

    #[test]
    fn channel_defaults() {
        let c: ChannelConfig = toml::from_str(
            r#"
            name = "ops"
            rotate_frequency = "0 9 * * 1"
            "#,
        )
        .unwrap();
        assert_eq!(c.poc_message_pattern, DEFAULT_POC_MESSAGE_PATTERN);
        assert_eq!(c.notify, NotifyTarget::Channel);
        assert!(c.enabled);
        assert!(c.included_rotators.is_empty());
    }

    #[test]
    fn channel_rules_carry_name_sets() {
        let c = ChannelConfig {
            name: "ops".into(),
            included_rotators: ["alice", "bob"].into_iter().collect(),
            excluded_rotators: ["bob"].into_iter().collect(),
            ..Default::default()
        };
        let rules = c.rules().unwrap();
        assert!(rules.admits("alice"));
        assert!(!rules.admits("bob"));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = PocmonConfig {
            token: Secret::new("xoxb-secret".into()),
            ..Default::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("xoxb-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn tz_parses_iana_names() {
        let cfg = PocmonConfig {
            timezone: "America/Los_Angeles".into(),
            ..Default::default()
        };
        assert_eq!(cfg.tz().unwrap(), chrono_tz::America::Los_Angeles);

        let bad = PocmonConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(bad.tz().is_err());
    }
}
