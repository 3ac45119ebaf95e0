//! # Gamecloud Match Synchronizer
//!
//! Client-side polling synchronizer for turn/match-based two-player games.
//! It exchanges small state fragments — named string parameters and discrete
//! integer events — with a fixed six-endpoint HTTP backend on behalf of two
//! paired players, and keeps the local ordering bookkeeping that makes the
//! exchange safe to consume from a game loop.
//!
//! ## Architecture Overview
//!
//! One [`MatchSynchronizer`] is constructed per match. It is a cloneable
//! handle over shared state: one clone drives the background polling loop on
//! a tokio task, the others stay with the game loop and read or mutate state
//! through accessor methods. Accessors always work on consistent snapshots;
//! the loop never holds the state lock across network I/O.
//!
//! The loop announces local readiness once, polls until the remote player is
//! ready, and then runs exchange cycles. One exchange cycle is four
//! sequential requests: push the full parameter list, pull the server's copy
//! (which replaces the local list wholesale), send the oldest queued outbound
//! event, and pull the opponent's active event. A pulled event is applied
//! only when its index is strictly greater than anything applied before, so
//! stale and duplicate records are discarded.
//!
//! Cycles are either continuous (`unlimited_collection`) or edge-triggered:
//! the game loop calls [`MatchSynchronizer::request_update`] and the next
//! loop iteration runs exactly one cycle. Completion is observable through
//! [`MatchSynchronizer::update_complete`] and the consume-on-read
//! [`MatchSynchronizer::has_new_data`] flag.
//!
//! Transport failures are logged and treated as "no data this cycle"; the
//! loop never stops because of them. It stops only when the connection is
//! deactivated.
//!
//! ## Module Organization
//!
//! - [`config`] — construction-time [`MatchSettings`] and the live knobs
//!   (poll frequency, connection active, request timeout).
//! - [`scripts`] — the fixed registry of backend script filenames.
//! - [`state`] — synchronized data types ([`Parameter`], [`MatchEvent`]) and
//!   the shared synchronizer state.
//! - [`transport`] — the [`Transport`] trait and the reqwest-backed
//!   [`HttpTransport`].
//! - [`sync`] — the [`MatchSynchronizer`] handle and its polling loop.
//!
//! ## Usage Example
//!
//! ```no_run
//! use gamecloud::{MatchSettings, MatchSynchronizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = MatchSettings::new(42, 1, "http://example.com/gamecloud/");
//!     let sync = MatchSynchronizer::new(settings);
//!     let loop_handle = sync.start();
//!
//!     let score = sync.create_parameter("playerScore", "0");
//!
//!     // From the game loop: request one exchange and consume the result.
//!     sync.request_update();
//!     if sync.has_new_data() {
//!         println!("score = {:?}", sync.parameter_value(score));
//!     }
//!
//!     sync.set_connection_active(false);
//!     let _ = loop_handle.await;
//! }
//! ```

pub mod config;
pub mod scripts;
pub mod state;
pub mod sync;
pub mod transport;

pub use config::MatchSettings;
pub use scripts::{ScriptKind, ScriptRegistry};
pub use state::{MatchEvent, Parameter};
pub use sync::MatchSynchronizer;
pub use transport::{HttpTransport, Transport, TransportError};
