//! Human-readable formatting for run summaries.

use std::time::Duration;

/// Formats an elapsed time, e.g. "4.2s", "3m 07s", "1h 00m 12s".
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}.{}s", d.subsec_millis() / 100)
    }
}

/// Picks the singular or plural noun for `count`.
#[must_use]
pub const fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
