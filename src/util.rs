//! Time helpers for the display timezone.

use chrono::DateTime;
use chrono::Days;
use chrono::FixedOffset;
use chrono::NaiveTime;
use chrono::Offset;
use chrono::TimeDelta;
use chrono::Utc;

/// Fixed offset for `hours` east of UTC. Out-of-range values fall back to UTC.
pub fn display_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or(Utc.fix())
}

/// Instant at which the day containing `now` started in `offset`.
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let midnight = local.date_naive().and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(offset)
        .single()
        .map_or(now, |start| start.with_timezone(&Utc))
}

/// Start of the day plus the rolling week and month windows ending at `now`.
pub fn stats_windows(
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = start_of_day(now, offset);
    let week = now.checked_sub_days(Days::new(7)).unwrap_or(now);
    let month = now.checked_sub_days(Days::new(30)).unwrap_or(now);
    (today, week, month)
}

/// Formats `at` in `offset` as `DD.MM.YYYY HH:MM`.
pub fn format_local(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string()
}

/// Label such as `GMT+4` for an offset.
pub fn offset_label(offset: FixedOffset) -> String {
    let hours = TimeDelta::seconds(i64::from(offset.local_minus_utc())).num_hours();
    if hours >= 0 {
        format!("GMT+{hours}")
    } else {
        format!("GMT{hours}")
    }
}
