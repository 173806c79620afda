//! Daily reward cooldown.

use core::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

/// Reads the cooldown setting, falling back to `fallback_minutes` when it is
/// missing or not a whole number of minutes.
#[must_use]
pub fn cooldown_from_setting(raw: Option<&str>, fallback_minutes: u32) -> Duration {
    let minutes = match raw.map(|value| value.trim().parse::<u32>()) {
        Some(Ok(minutes)) => minutes,
        Some(Err(_)) | None => {
            warn!(
                setting = ?raw,
                fallback_minutes,
                "could not parse daily cooldown setting, using default"
            );
            fallback_minutes
        }
    };
    Duration::from_secs(u64::from(minutes) * 60)
}

/// Returns the time left before the next claim, or `None` if a claim made
/// at `last` allows claiming again at `now`.
#[must_use]
pub fn remaining(last: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
    let cooldown = TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX);
    let elapsed = now.signed_duration_since(last);
    if elapsed >= cooldown {
        return None;
    }
    Some((cooldown - elapsed).to_std().unwrap_or_default())
}

/// Formats a remaining cooldown as hours and minutes, or seconds when under
/// a minute.
///
/// ```
/// use core::time::Duration;
/// use bjbot::daily::format_remaining;
///
/// assert_eq!(format_remaining(Duration::from_secs(3_720)), "1 hour(s) 2 minute(s)");
/// assert_eq!(format_remaining(Duration::from_secs(42)), "42 second(s)");
/// ```
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hour(s)"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} minute(s)"));
    }
    if hours == 0 && minutes == 0 {
        parts.push(format!("{seconds} second(s)"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn cooldown_setting_falls_back_on_garbage() {
        assert_eq!(
            cooldown_from_setting(Some("90"), 120),
            Duration::from_secs(90 * 60)
        );
        assert_eq!(
            cooldown_from_setting(Some("soon"), 120),
            Duration::from_secs(120 * 60)
        );
        assert_eq!(
            cooldown_from_setting(Some("-5"), 120),
            Duration::from_secs(120 * 60)
        );
        assert_eq!(cooldown_from_setting(None, 30), Duration::from_secs(30 * 60));
    }

    #[test]
    fn remaining_counts_down_to_none() {
        let last = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let cooldown = Duration::from_secs(2 * 3600);

        let early = last + TimeDelta::minutes(30);
        assert_eq!(
            remaining(last, early, cooldown),
            Some(Duration::from_secs(90 * 60))
        );
        assert_eq!(remaining(last, last + TimeDelta::hours(2), cooldown), None);
        assert_eq!(remaining(last, last + TimeDelta::days(1), cooldown), None);
    }

    #[test]
    fn format_drops_seconds_once_over_a_minute() {
        assert_eq!(format_remaining(Duration::from_secs(7_200)), "2 hour(s)");
        assert_eq!(format_remaining(Duration::from_secs(61)), "1 minute(s)");
        assert_eq!(format_remaining(Duration::ZERO), "0 second(s)");
    }
}
