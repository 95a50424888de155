//! Starter config written by `pocmon init`.

/// Generate a documented starter config for `channel`.
pub fn default_config_template(channel: &str) -> String {
    format!(
        r##"# pocmon configuration
#
# Environment variable substitution is supported: ${{ENV_VAR}} or
# ${{ENV_VAR:-fallback}}. POCMON_TOKEN, POCMON_TIMEZONE and
# POCMON_SLACK_API_BASE override the values below.

token = "${{POCMON_TOKEN}}"       # Bot token (xoxb-...)
timezone = "UTC"                  # IANA zone the schedules run in

[slack]
api_base = "https://slack.com/api"
timeout_secs = 30

[[channels]]
name = "{channel}"                # Without the leading '#'
rotate_frequency = "0 9 * * 1"    # Cron: 5, 6 or 7 fields (Mondays 09:00)
poc_message_pattern = "POC: %s"   # Topic mention, exactly one %s
message_poc_change = "%s is now the POC for #%s"  # Rotator, then channel
notify = "channel"                # "channel" or "direct"
enabled = true
# included_rotators = ["alice", "bob"]   # Only these rotate (empty = everyone)
# excluded_rotators = ["deploy-bot"]     # Never rotate these
"##
    )
}
