use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One resolvable betting deadline. All timestamps are Unix seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// Authoritative close time, if known.
    pub closes_at: Option<i64>,
    /// Secondary deadline used when `closes_at` is absent.
    pub fallback_at: Option<i64>,
    /// Out-of-band open flag from upstream data. `Some(false)` closes the
    /// window regardless of any timestamp.
    pub explicit_open: Option<bool>,
}

impl TimeWindow {
    /// Deadline in effect: `closes_at`, then `fallback_at`, then 0 (already past).
    pub fn deadline(&self) -> i64 {
        self.closes_at.or(self.fallback_at).unwrap_or(0)
    }
}

/// Market or event object as returned by the upstream API.
///
/// Only the fields the classifier needs are kept; everything else in the
/// upstream payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketWindow {
    #[serde(default)]
    pub betting_open: Option<bool>,
    #[serde(default)]
    pub betting_closes_at: Option<i64>,
    #[serde(default)]
    pub commence_time: Option<i64>,
    #[serde(default)]
    pub resolution_time: Option<i64>,
}

impl From<&MarketWindow> for TimeWindow {
    fn from(market: &MarketWindow) -> Self {
        TimeWindow {
            closes_at: market.betting_closes_at,
            fallback_at: market.commence_time.or(market.resolution_time),
            explicit_open: market.betting_open,
        }
    }
}

/// Tri-state betting status consumed by rendering code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Open,
    ClosingSoon,
    Closed,
}

impl MarketState {
    pub fn label(&self) -> &'static str {
        match self {
            MarketState::Open => "open",
            MarketState::ClosingSoon => "closing soon",
            MarketState::Closed => "closed",
        }
    }
}

/// Status derived on every tick. Never persisted, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub state: MarketState,
    pub seconds_remaining: u64,
    pub display_text: String,
}

impl StatusResult {
    pub fn closed() -> Self {
        Self {
            state: MarketState::Closed,
            seconds_remaining: 0,
            display_text: "Closed".to_string(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == MarketState::Closed
    }
}

/// One countdown observation, emitted as a JSON line by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: String,
    pub market: String,
    pub seq: u64,
    #[serde(flatten)]
    pub status: StatusResult,
}

/// Body of a soft existence check. Serialized as either
/// `{"exists":true,"pool":...}` or `{"exists":false,"status":N}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolCheck {
    Found { exists: bool, pool: Value },
    Missing { exists: bool, status: u16 },
}

impl PoolCheck {
    pub fn found(pool: Value) -> Self {
        PoolCheck::Found { exists: true, pool }
    }

    pub fn missing(status: u16) -> Self {
        PoolCheck::Missing {
            exists: false,
            status,
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            PoolCheck::Found { exists, .. } | PoolCheck::Missing { exists, .. } => *exists,
        }
    }
}
