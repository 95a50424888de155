//! Configuration validation.
//!
//! Flags unknown/misspelled fields in the raw file, then checks the parsed
//! config: token, time zone, cron expressions and message templates. Template
//! problems are configuration errors caught here, before any rotation runs.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use {
    pocmon_rotation::{Template, TopicMutator},
    serde_json::Value,
};

use crate::{
    loader::{find_config_file, load_config, load_config_value},
    schema::PocmonConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "auth", "timezone", "channel",
    /// "schedule", "template", "rules"
    pub category: &'static str,
    /// Dotted path, e.g. "channels[0].rotate_frequency"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Array(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Struct};

    let channel = Struct(HashMap::from([
        ("name", Leaf),
        ("rotate_frequency", Leaf),
        ("poc_message_pattern", Leaf),
        ("message_poc_change", Leaf),
        ("included_rotators", Leaf),
        ("excluded_rotators", Leaf),
        ("notify", Leaf),
        ("enabled", Leaf),
    ]));

    Struct(HashMap::from([
        ("token", Leaf),
        ("timezone", Leaf),
        (
            "slack",
            Struct(HashMap::from([("api_base", Leaf), ("timeout_secs", Leaf)])),
        ),
        ("channels", Array(Box::new(channel))),
    ]))
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(c, d)| (d, c))
        .map(|(c, _)| c)
}

fn check_unknown_fields(
    value: &Value,
    schema: &KnownKeys,
    prefix: &str,
    result: &mut ValidationResult,
) {
    match (value, schema) {
        (Value::Object(map), KnownKeys::Struct(fields)) => {
            let known: Vec<&str> = fields.keys().copied().collect();
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match fields.get(key.as_str()) {
                    Some(child_schema) => check_unknown_fields(child, child_schema, &path, result),
                    None => {
                        let message = match suggest(key, &known, 3) {
                            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                            None => "unknown field".to_string(),
                        };
                        result.push(Severity::Error, "unknown-field", path, message);
                    },
                }
            }
        },
        (Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                check_unknown_fields(item, item_schema, &format!("{prefix}[{i}]"), result);
            }
        },
        _ => {},
    }
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one when
/// `path` is `None`.
#[must_use]
pub fn validate_file(path: Option<&Path>) -> ValidationResult {
    let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

    let Some(actual_path) = config_path else {
        let mut result = ValidationResult::default();
        result.push(
            Severity::Error,
            "syntax",
            "",
            "no config file found (looked for pocmon.{toml,yaml,yml,json} and config.json)",
        );
        return result;
    };

    let mut result = match load_config_value(&actual_path) {
        Ok(value) => {
            let mut r = ValidationResult::default();
            check_unknown_fields(&value, &build_schema_map(), "", &mut r);
            r
        },
        Err(e) => {
            let mut r = ValidationResult::default();
            r.push(Severity::Error, "syntax", "", e.to_string());
            r.config_path = Some(actual_path);
            return r;
        },
    };

    match load_config(&actual_path) {
        Ok(config) => result.diagnostics.extend(validate(&config).diagnostics),
        Err(e) => result.push(Severity::Error, "syntax", "", e.to_string()),
    }
    result.config_path = Some(actual_path);
    result
}

/// Check a parsed config.
#[must_use]
pub fn validate(config: &PocmonConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !config.has_token() {
        result.push(
            Severity::Error,
            "auth",
            "token",
            "no token set (use `token` or POCMON_TOKEN)",
        );
    }

    if config.tz().is_err() {
        result.push(
            Severity::Error,
            "timezone",
            "timezone",
            format!("unknown timezone \"{}\"", config.timezone),
        );
    }

    if config.channels.is_empty() {
        result.push(
            Severity::Warning,
            "channel",
            "channels",
            "no channels configured; nothing will rotate",
        );
    }

    let mut seen = HashSet::new();
    for (i, channel) in config.channels.iter().enumerate() {
        let at = |field: &str| format!("channels[{i}].{field}");

        if channel.name.trim().is_empty() {
            result.push(Severity::Error, "channel", at("name"), "channel name is empty");
        } else if channel.name.starts_with('#') {
            result.push(
                Severity::Warning,
                "channel",
                at("name"),
                "leading '#' is not part of the channel name",
            );
        }
        if !channel.name.is_empty() && !seen.insert(channel.name.as_str()) {
            result.push(
                Severity::Error,
                "channel",
                at("name"),
                format!("duplicate channel \"{}\"", channel.name),
            );
        }

        if channel.rotate_frequency.trim().is_empty() {
            result.push(
                Severity::Error,
                "schedule",
                at("rotate_frequency"),
                "rotate_frequency is required",
            );
        } else if let Err(e) = pocmon_cron::schedule::parse_cron(&channel.rotate_frequency) {
            result.push(
                Severity::Error,
                "schedule",
                at("rotate_frequency"),
                e.to_string(),
            );
        }

        if let Err(e) = TopicMutator::new(&channel.poc_message_pattern) {
            result.push(
                Severity::Error,
                "template",
                at("poc_message_pattern"),
                e.to_string(),
            );
        }
        if let Err(e) = Template::parse_with_slots(&channel.message_poc_change, 1, 2) {
            result.push(
                Severity::Error,
                "template",
                at("message_poc_change"),
                e.to_string(),
            );
        }

        for name in channel
            .included_rotators
            .iter()
            .filter(|n| channel.excluded_rotators.contains(n))
        {
            result.push(
                Severity::Warning,
                "rules",
                at("included_rotators"),
                format!("\"{name}\" is also excluded and will never rotate"),
            );
        }

        if !channel.enabled {
            result.push(Severity::Info, "channel", at("enabled"), "channel is disabled");
        }
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{ChannelConfig, NameSet},
        rstest::rstest,
        secrecy::Secret,
        std::io::Write,
    };

    fn channel(name: &str, cron: &str) -> ChannelConfig {
        ChannelConfig {
            name: name.into(),
            rotate_frequency: cron.into(),
            ..Default::default()
        }
    }

    fn config(channels: Vec<ChannelConfig>) -> PocmonConfig {
        PocmonConfig {
            token: Secret::new("xoxb-1".into()),
            channels,
            ..Default::default()
        }
    }

    fn paths(result: &ValidationResult, severity: Severity) -> Vec<String> {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.path.clone())
            .collect()
    }

    #[rstest]
    #[case("abc", "abc", 0)]
    #[case("", "abc", 3)]
    #[case("timezone", "timzone", 1)]
    #[case("kitten", "sitting", 3)]
    fn levenshtein_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let result = validate(&config(vec![channel("ops", "0 9 * * 1-5")]));
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_token_is_error() {
        let mut cfg = config(vec![channel("ops", "0 9 * * *")]);
        cfg.token = Secret::new(String::new());
        assert_eq!(paths(&validate(&cfg), Severity::Error), vec!["token"]);
    }

    #[test]
    fn bad_timezone_is_error() {
        let mut cfg = config(vec![channel("ops", "0 9 * * *")]);
        cfg.timezone = "Mars/Olympus".into();
        assert_eq!(paths(&validate(&cfg), Severity::Error), vec!["timezone"]);
    }

    #[test]
    fn no_channels_is_warning() {
        let result = validate(&config(vec![]));
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn bad_cron_and_duplicate_names() {
        let result = validate(&config(vec![
            channel("ops", "every monday"),
            channel("ops", "0 9 * * *"),
            channel("", "0 9 * * *"),
        ]));
        assert_eq!(paths(&result, Severity::Error), vec![
            "channels[0].rotate_frequency",
            "channels[1].name",
            "channels[2].name",
        ]);
    }

    #[test]
    fn template_slot_counts_are_checked() {
        let mut ch = channel("ops", "0 9 * * *");
        ch.poc_message_pattern = "POC".into();
        ch.message_poc_change = "%s %s %s".into();
        let result = validate(&config(vec![ch]));
        assert_eq!(paths(&result, Severity::Error), vec![
            "channels[0].poc_message_pattern",
            "channels[0].message_poc_change",
        ]);
    }

    #[test]
    fn overlap_and_disabled_are_reported() {
        let mut ch = channel("#ops", "0 9 * * *");
        ch.included_rotators = NameSet::from_iter(["alice", "bob"]);
        ch.excluded_rotators = NameSet::from_iter(["bob"]);
        ch.enabled = false;
        let result = validate(&config(vec![ch]));
        assert!(!result.has_errors());
        assert_eq!(paths(&result, Severity::Warning), vec![
            "channels[0].name",
            "channels[0].included_rotators",
        ]);
        assert_eq!(result.count(Severity::Info), 1);
    }

    #[test]
    fn unknown_fields_with_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pocmon.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            br#"
            token = "xoxb-1"
            timzone = "UTC"

            [[channels]]
            name = "ops"
            rotate_frequency = "0 9 * * *"
            excluded_rotator = ["bot"]
            "#,
        )
        .unwrap();

        let result = validate_file(Some(&path));
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-field")
            .collect();
        assert_eq!(unknown.len(), 2);
        assert!(unknown.iter().any(|d| d.path == "timzone"
            && d.message.contains("did you mean \"timezone\"")));
        assert!(unknown.iter().any(|d| d.path == "channels[0].excluded_rotator"
            && d.message.contains("excluded_rotators")));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn syntax_error_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pocmon.toml");
        std::fs::write(&path, "token = ").unwrap();
        let result = validate_file(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic {
            severity: Severity::Error,
            category: "schedule",
            path: "channels[0].rotate_frequency".into(),
            message: "bad".into(),
        };
        assert_eq!(
            d.to_string(),
            "error [schedule] channels[0].rotate_frequency: bad"
        );
    }
}
