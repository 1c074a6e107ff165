//! Synthesised progress for jobs whose provider exposes none.
//!
//! Two phases:
//! - before any match: `10 + timeFrac * 40` (tops out at 50)
//! - after the first match: `50 + countFrac * 45` (tops out at 95)
//!
//! Only a `Completed` job reaches 100, and the scheduler sets that
//! directly rather than through [`estimate_progress`].

/// Progress reported once a job is accepted, before the first tick.
pub const PROGRESS_SUBMITTED: u8 = 10;
/// Ceiling of the waiting phase.
pub const PROGRESS_WAITING_CAP: u8 = 50;
/// Ceiling while a job is still active.
pub const PROGRESS_ACTIVE_CAP: u8 = 95;
/// Progress of a completed job.
pub const PROGRESS_DONE: u8 = 100;

/// Width of the waiting phase (10 -> 50).
const WAITING_SPAN: f64 = 40.0;
/// Width of the matching phase (50 -> 95).
const MATCHING_SPAN: f64 = 45.0;

/// Blend the time and count signals into a 0-95 estimate.
///
/// The result is not clamped against earlier values; use
/// [`advance_progress`] to keep a job's progress monotonic.
pub fn estimate_progress(attempts: u32, max_attempts: u32, matched: usize, target_count: u32) -> u8 {
    if matched == 0 {
        let time_frac = fraction(attempts as f64, max_attempts as f64);
        (PROGRESS_SUBMITTED as f64 + time_frac * WAITING_SPAN).floor() as u8
    } else {
        let count_frac = fraction(matched as f64, target_count as f64);
        (PROGRESS_WAITING_CAP as f64 + count_frac * MATCHING_SPAN).floor() as u8
    }
}

/// New progress for an active job: never below `previous`, never above
/// [`PROGRESS_ACTIVE_CAP`].
pub fn advance_progress(previous: u8, estimate: u8) -> u8 {
    previous.max(estimate.min(PROGRESS_ACTIVE_CAP))
}

fn fraction(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 1.0;
    }
    (part / whole).clamp(0.0, 1.0)
}
