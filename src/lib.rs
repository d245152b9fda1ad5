pub mod client;
pub mod config;
pub mod countdown;
pub mod poll;
pub mod relay;
pub mod reporter;
pub mod types;

/// Upstream REST API base URL (prediction pools, markets, balances)
pub const UPSTREAM_API_BASE: &str = "https://api.0xnull.io";

/// Upstream path prefix for prediction pools; the only prefix eligible for soft checks
pub const POOL_PATH_PREFIX: &str = "/api/predictions/pool/";

/// Relay query parameter carrying the logical upstream path
pub const PATH_PARAM: &str = "path";

/// Relay query flag selecting soft existence-check mode
pub const SOFT_CHECK_PARAM: &str = "soft_check";
