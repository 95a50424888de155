use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    chrono::DateTime,
    chrono_tz::Tz,
    tracing::{debug, error, info, warn},
};

use {
    pocmon_config::{PocmonConfig, Severity},
    pocmon_cron::{FireFn, RotationJob, RotationScheduler},
    pocmon_rotation::{Notifier, RotationService, RotatorRules},
    pocmon_slack::SlackClient,
};

/// Logs topic and message changes instead of sending them.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn set_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        info!(channel_id, topic, "dry run: would set topic");
        Ok(())
    }

    async fn post_message(&self, target: &str, text: &str) -> Result<()> {
        info!(to = target, text, "dry run: would post message");
        Ok(())
    }
}

/// Load the config and refuse to continue on validation errors.
fn load_checked(path: Option<&Path>) -> Result<PocmonConfig> {
    let loaded = pocmon_config::load(path)?;
    let result = pocmon_config::validate(&loaded.config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => debug!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        bail!(
            "invalid configuration ({} error(s)); run `pocmon check` for details",
            result.count(Severity::Error)
        );
    }
    Ok(loaded.config)
}

/// Rotation rules for every enabled channel, keyed by channel name.
fn rules_for(config: &PocmonConfig) -> Result<HashMap<String, RotatorRules>> {
    config
        .enabled_channels()
        .map(|c| {
            c.rules()
                .with_context(|| format!("channel #{}", c.name))
                .map(|rules| (c.name.clone(), rules))
        })
        .collect()
}

fn slack_client(config: &PocmonConfig) -> Result<Arc<SlackClient>> {
    Ok(Arc::new(SlackClient::new(
        config.token.clone(),
        config.slack.api_base.clone(),
        Duration::from_secs(config.slack.timeout_secs),
    )?))
}

fn format_ms(ms: u64, tz: Tz) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(|| ms.to_string(), |dt| dt.with_timezone(&tz).to_rfc3339())
}

/// Run every enabled channel on its schedule until Ctrl-C.
pub async fn run(path: Option<&Path>) -> Result<()> {
    let config = load_checked(path)?;
    let tz = config.tz()?;

    let jobs: Vec<RotationJob> = config
        .enabled_channels()
        .map(|c| RotationJob::new(&c.name, &c.rotate_frequency))
        .collect();
    if jobs.is_empty() {
        warn!("no enabled channels configured, nothing to schedule");
        return Ok(());
    }

    let slack = slack_client(&config)?;
    let service = Arc::new(RotationService::new(
        slack.clone(),
        slack,
        rules_for(&config)?,
    ));

    let on_fire: FireFn = {
        let service = Arc::clone(&service);
        Arc::new(move |channel| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                let outcome = service.rotate(&channel).await?;
                debug!(channel = %outcome.channel, order = ?outcome.order, "rotation order");
                anyhow::Ok(())
            })
        })
    };

    let scheduler = RotationScheduler::new(jobs, tz, on_fire)?;
    scheduler.start().await;

    for job in scheduler.status().await.jobs {
        let next = job
            .state
            .next_run_at_ms
            .map_or_else(|| "never".to_string(), |ms| format_ms(ms, tz));
        info!(channel = %job.channel, schedule = %job.expr, next_run = %next, "rotation scheduled");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.stop().await;
    Ok(())
}

/// Rotate a single channel now and print the outcome.
pub async fn rotate_once(path: Option<&Path>, channel: &str, dry_run: bool) -> Result<()> {
    let config = load_checked(path)?;
    let Some(channel_config) = config.channel(channel) else {
        bail!("channel #{channel} is not configured");
    };
    if !channel_config.enabled {
        warn!(channel, "channel is disabled; rotating anyway");
    }

    let rules = HashMap::from([(channel.to_string(), channel_config.rules()?)]);
    let slack = slack_client(&config)?;
    let notifier: Arc<dyn Notifier> = if dry_run {
        Arc::new(LoggingNotifier)
    } else {
        slack.clone()
    };
    let service = RotationService::new(slack, notifier, rules);

    let outcome = service.rotate(channel).await?;
    println!("#{}: {} is now the POC", outcome.channel, outcome.rotator);
    println!("topic: {}", outcome.topic);
    if dry_run {
        println!("(dry run: nothing was sent)");
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        pocmon_config::ChannelConfig,
    };

    fn channel(name: &str, enabled: bool) -> ChannelConfig {
        ChannelConfig {
            name: name.into(),
            rotate_frequency: "0 9 * * 1".into(),
            enabled,
            ..Default::default()
        }
    }

    #[test]
    fn rules_only_for_enabled_channels() {
        let config = PocmonConfig {
            channels: vec![channel("ops", true), channel("old", false)],
            ..Default::default()
        };
        let rules = rules_for(&config).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.contains_key("ops"));
    }

    #[test]
    fn bad_template_names_the_channel() {
        let mut bad = channel("ops", true);
        bad.poc_message_pattern = "no slot".into();
        let config = PocmonConfig {
            channels: vec![bad],
            ..Default::default()
        };
        let err = rules_for(&config).unwrap_err();
        assert!(format!("{err:#}").contains("channel #ops"));
    }

    #[test]
    fn load_checked_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pocmon.toml");
        std::fs::write(
            &path,
            "token = \"xoxb-1\"\n[[channels]]\nname = \"ops\"\nrotate_frequency = \"soon\"\n",
        )
        .unwrap();
        let err = load_checked(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn format_ms_uses_zone() {
        // 2024-02-01T00:00:00Z
        assert_eq!(
            format_ms(1_706_745_600_000, chrono_tz::Asia::Tokyo),
            "2024-02-01T09:00:00+09:00"
        );
    }

    #[tokio::test]
    async fn logging_notifier_never_fails() {
        let n = LoggingNotifier;
        n.set_topic("C1", "POC: alice").await.unwrap();
        n.post_message("ops", "alice is now the POC").await.unwrap();
    }
}
