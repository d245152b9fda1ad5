use crate::types::{MarketState, StatusResult, TimeWindow};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Default "closing soon" threshold in seconds.
pub const DEFAULT_CLOSING_SOON_SECS: i64 = 2 * HOUR;

/// Threshold policy for flagging a window as closing soon.
///
/// A single monotonic threshold: any remaining time strictly below
/// `closing_soon_secs` is `ClosingSoon`, anything at or above it is `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingPolicy {
    pub closing_soon_secs: i64,
}

impl Default for ClosingPolicy {
    fn default() -> Self {
        Self {
            closing_soon_secs: DEFAULT_CLOSING_SOON_SECS,
        }
    }
}

/// Classify a betting window at wall-clock time `now` (Unix seconds).
///
/// `explicit_open == Some(false)` wins over any timestamp. Otherwise the
/// deadline is `closes_at`, then `fallback_at`, then 0, so a window with no
/// usable timestamp is always closed.
pub fn classify(window: &TimeWindow, now: i64, policy: &ClosingPolicy) -> StatusResult {
    if window.explicit_open == Some(false) {
        return StatusResult::closed();
    }

    let diff = window.deadline().saturating_sub(now);
    if diff <= 0 {
        return StatusResult::closed();
    }

    let state = if diff < policy.closing_soon_secs {
        MarketState::ClosingSoon
    } else {
        MarketState::Open
    };

    StatusResult {
        state,
        seconds_remaining: diff as u64,
        display_text: format_remaining(diff),
    }
}

/// Human-readable remaining time: `"4m 59s"`, `"3h 12m"`, `"2d 5h"`.
///
/// Units are truncated, never rounded. Non-positive input renders as `"0m 0s"`.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < HOUR {
        format!("{}m {}s", secs / MINUTE, secs % MINUTE)
    } else if secs < DAY {
        format!("{}h {}m", secs / HOUR, (secs % HOUR) / MINUTE)
    } else {
        format!("{}d {}h", secs / DAY, (secs % DAY) / HOUR)
    }
}

/// Fires a callback once per transition into `Closed`.
///
/// Feed it every tick's result. The callback runs when a closed result
/// follows a non-closed one; repeated closed ticks are ignored until the
/// window reopens. A window first observed as closed never fires.
pub struct ClosedNotifier<F: FnMut()> {
    on_closed: F,
    last: Option<MarketState>,
}

impl<F: FnMut()> ClosedNotifier<F> {
    pub fn new(on_closed: F) -> Self {
        Self {
            on_closed,
            last: None,
        }
    }

    /// Record one observation. Returns `true` if the callback fired.
    pub fn observe(&mut self, status: &StatusResult) -> bool {
        let was_open = matches!(
            self.last,
            Some(MarketState::Open) | Some(MarketState::ClosingSoon)
        );
        self.last = Some(status.state);
        if was_open && status.is_closed() {
            (self.on_closed)();
            true
        } else {
            false
        }
    }
}
