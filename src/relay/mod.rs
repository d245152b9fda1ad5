//! HTTP request relay.
//!
//! Forwards `?path=<logical path>` requests to one configured upstream REST
//! API and always answers with valid JSON:
//!
//! ```text
//! client ── /relay?path=/api/x&k=v ──▶ relay ── /api/x?k=v ──▶ upstream
//!        ◀── JSON (passthrough, wrapped, or error) ──┘
//! ```
//!
//! Upstream bodies are classified once into [`upstream::UpstreamBody`] and
//! mapped onto an outward [`upstream::JsonReply`]. Transport failures and
//! relay-internal errors become [`error::RelayError`] responses. Soft-check
//! mode (`soft_check=1` on pool paths) never fails and answers with a
//! [`crate::types::PoolCheck`].

pub mod error;
pub mod handler;
pub mod router;
pub mod state;
pub mod upstream;

pub use router::create_router;
pub use state::RelayState;
