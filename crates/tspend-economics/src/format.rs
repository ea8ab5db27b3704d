// crates/tspend-economics/src/format.rs
//
// Human friendly durations for reports.

use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// `"{d}d{h}h"` for durations longer than a day, otherwise `"{h}h{m}m"`
/// truncated to the minute.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs > DAY {
        let days = secs / DAY;
        let hours = (secs % DAY) / HOUR;
        return format!("{}d{}h", days, hours);
    }
    let hours = secs / HOUR;
    let minutes = (secs % HOUR) / MINUTE;
    format!("{}h{}m", hours, minutes)
}

/// Duration of `blocks` blocks at `per_block`. Negative counts give zero.
pub fn blocks_duration(blocks: i64, per_block: Duration) -> Duration {
    per_block * blocks.max(0).min(u32::MAX as i64) as u32
}

pub fn plural<'s>(n: i64, one: &'s str, many: &'s str) -> &'s str {
    if n == 1 {
        one
    } else {
        many
    }
}
