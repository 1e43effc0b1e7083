//! "Time since added" labels.

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Formats an age in whole seconds as a coarse relative label.
///
/// Uses integer division and a fixed plural, so 60 seconds reads
/// `"1 minutes ago"`. Negative ages (server clock ahead of ours) read as
/// `"0 seconds ago"`.
#[must_use]
pub fn time_ago_label(age_seconds: i64) -> String {
    let seconds = age_seconds.max(0);
    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{} minutes ago", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{} hours ago", seconds / HOUR)
    } else {
        format!("{} days ago", seconds / DAY)
    }
}
