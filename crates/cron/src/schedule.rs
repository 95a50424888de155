//! Cron expression parsing and next-run computation.
//!
//! Accepts classic 5-field expressions (`min hour dom month dow`), 6-field
//! expressions with a leading seconds field, and the `cron` crate's native
//! 7-field form (with a trailing year). In the 5- and 6-field forms a numeric
//! day of week follows crontab numbering (0 or 7 = Sunday); it is rewritten to
//! the `cron` crate's numbering (1 = Sunday) before parsing.

use {
    chrono::DateTime,
    chrono_tz::Tz,
    cron::Schedule,
};

use crate::{Error, Result};

/// Parse a 5, 6 or 7 field cron expression.
pub fn parse_cron(expr: &str) -> Result<Schedule> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = match fields.len() {
        5 => {
            let dow = crontab_day_of_week(fields[4]).map_err(|e| Error::invalid_cron(expr, e))?;
            format!("0 {} {} {} {} {dow} *", fields[0], fields[1], fields[2], fields[3])
        },
        6 => {
            let dow = crontab_day_of_week(fields[5]).map_err(|e| Error::invalid_cron(expr, e))?;
            format!("{} {dow}", fields[..5].join(" "))
        },
        7 => fields.join(" "),
        n => {
            return Err(Error::invalid_cron(
                expr,
                format!("expected 5, 6 or 7 fields, got {n}"),
            ));
        },
    };

    normalized
        .parse::<Schedule>()
        .map_err(|e| Error::invalid_cron(expr, e))
}

/// Next firing strictly after `now_ms` (epoch millis), evaluated in `tz`.
pub fn next_after(schedule: &Schedule, tz: Tz, now_ms: u64) -> Option<u64> {
    let now = DateTime::from_timestamp_millis(i64::try_from(now_ms).ok()?)?.with_timezone(&tz);
    schedule
        .after(&now)
        .next()
        .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok())
}

/// Parse `expr` and compute its next firing after `now_ms` in `tz`.
///
/// Returns `Ok(None)` when the schedule has no future firing.
pub fn compute_next_run(expr: &str, tz: Tz, now_ms: u64) -> Result<Option<u64>> {
    Ok(next_after(&parse_cron(expr)?, tz, now_ms))
}

/// Rewrite numeric crontab days (0-7, Sunday = 0 or 7) to 1-7 (Sunday = 1).
/// Names (`MON`), `*` and `?` pass through.
fn crontab_day_of_week(field: &str) -> std::result::Result<String, String> {
    let shift = |day: &str| -> std::result::Result<Option<u8>, String> {
        match day.parse::<u8>() {
            Ok(n) if n <= 7 => Ok(Some(n % 7 + 1)),
            Ok(n) => Err(format!("day of week {n} out of range 0-7")),
            Err(_) => Ok(None),
        }
    };

    let mut out = Vec::new();
    for token in field.split(',') {
        let (range, step) = match token.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (token, None),
        };
        let suffix = step.map(|s| format!("/{s}")).unwrap_or_default();

        let rewritten = match range.split_once('-') {
            Some((start, end)) => match (shift(start)?, shift(end)?) {
                (Some(s), Some(e)) if s <= e => format!("{s}-{e}{suffix}"),
                (Some(s), Some(e)) if step.is_none() => {
                    // Wraps past Saturday, e.g. 1-7 (Mon..Sun).
                    if e == 1 {
                        format!("{s}-7,1")
                    } else {
                        format!("{s}-7,1-{e}")
                    }
                },
                (Some(_), Some(_)) => return Err(format!("unsupported day-of-week range {token}")),
                _ => token.to_string(),
            },
            None => match shift(range)? {
                Some(day) => format!("{day}{suffix}"),
                None => token.to_string(),
            },
        };
        out.push(rewritten);
    }
    Ok(out.join(","))
}
