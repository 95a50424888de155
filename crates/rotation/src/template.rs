//! `%s`-style message templates.
//!
//! A template is literal text with `%s` slots filled in order. `%%` renders a
//! single `%`; any other `%` sequence is kept literally.

use regex::Regex;

use crate::{Error, Result};

/// Pattern a rotator name must match to be recognized in free text.
pub const MENTION_WILDCARD: &str = "[a-z-]+";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot,
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '%' {
                literal.push(ch);
                continue;
            }
            match chars.peek() {
                Some('s') => {
                    chars.next();
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot);
                },
                Some('%') => {
                    chars.next();
                    literal.push('%');
                },
                _ => literal.push('%'),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// Parse and require exactly `min..=max` slots.
    pub fn parse_with_slots(source: &str, min: usize, max: usize) -> Result<Self> {
        let template = Self::parse(source);
        let slots = template.slot_count();
        if slots < min || slots > max {
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(Error::invalid_template(
                source,
                format!("expected {expected} %s slot(s), found {slots}"),
            ));
        }
        Ok(template)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Slot))
            .count()
    }

    /// Fill slots in order. Slots without an argument render empty.
    #[must_use]
    pub fn render(&self, args: &[&str]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut args = args.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot => {
                    if let Some(arg) = args.next() {
                        out.push_str(arg);
                    }
                },
            }
        }
        out
    }

    /// Regex matching any rendering of this template whose slots hold a
    /// rotator-style name.
    pub fn detection_regex(&self) -> Result<Regex> {
        let mut pattern = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Slot => pattern.push_str(MENTION_WILDCARD),
            }
        }
        Regex::new(&pattern).map_err(|e| Error::invalid_template(&self.source, e))
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("POC: %s", 1)]
    #[case("%s is now the POC for #%s", 2)]
    #[case("no slots here", 0)]
    #[case("100%% sure: %s", 1)]
    #[case("%%s is escaped", 0)]
    fn counts_slots(#[case] source: &str, #[case] expected: usize) {
        assert_eq!(Template::parse(source).slot_count(), expected);
    }

    #[test]
    fn renders_in_order() {
        let t = Template::parse("%s is now the POC for #%s");
        assert_eq!(t.render(&["alice", "ops"]), "alice is now the POC for #ops");
    }

    #[test]
    fn missing_args_render_empty() {
        let t = Template::parse("%s and %s");
        assert_eq!(t.render(&["alice"]), "alice and ");
    }

    #[test]
    fn percent_escapes_and_stray_percent() {
        let t = Template::parse("100%% of %s at 5%");
        assert_eq!(t.render(&["bob"]), "100% of bob at 5%");
    }

    #[test]
    fn detection_escapes_literals() {
        let re = Template::parse("(POC) %s.").detection_regex().unwrap();
        assert!(re.is_match("topic (POC) alice-b."));
        assert!(!re.is_match("topic POC alice"));
        assert!(!re.is_match("(POC) Alice."));
    }

    #[test]
    fn parse_with_slots_rejects_wrong_count() {
        assert!(Template::parse_with_slots("POC", 1, 1).is_err());
        assert!(Template::parse_with_slots("%s %s", 1, 1).is_err());
        assert!(Template::parse_with_slots("%s %s %s", 1, 2).is_err());
        assert!(Template::parse_with_slots("%s", 1, 2).is_ok());
    }

    #[test]
    fn display_is_source() {
        assert_eq!(Template::parse("POC: %s").to_string(), "POC: %s");
    }
}
