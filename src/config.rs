//! Match identity and connection configuration.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Construction-time settings for one match synchronizer.
///
/// `poll_frequency_ms` and `request_timeout_ms` are advisory pacing knobs:
/// the loop sleeps `poll_frequency_ms` between iterations and gives every
/// backend request `request_timeout_ms` to complete.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub match_id: u32,
    /// Player slot assigned by the server, 1 or 2.
    pub assigned_player: u32,
    /// Base URL of the backend scripts, e.g. `http://example.com/gamecloud/`.
    pub host_url: String,
    /// Whether the polling loop should run at all. Flipping this to false
    /// later stops the loop between iterations.
    pub connection_active: bool,
    pub poll_frequency_ms: u64,
    /// When true the loop runs an exchange cycle on every iteration instead
    /// of waiting for [`request_update`](crate::MatchSynchronizer::request_update).
    /// WARNING: this keeps the backend busy at the full polling rate.
    pub unlimited_collection: bool,
    pub request_timeout_ms: u64,
}

impl MatchSettings {
    pub fn new(match_id: u32, assigned_player: u32, host_url: impl Into<String>) -> Self {
        Self {
            match_id,
            assigned_player,
            host_url: host_url.into(),
            connection_active: true,
            poll_frequency_ms: 100,
            unlimited_collection: false,
            request_timeout_ms: 2000,
        }
    }
}

/// Live configuration shared between caller threads and the polling loop.
/// Setters take effect on the loop's next iteration.
#[derive(Debug)]
pub(crate) struct SyncConfig {
    frequency_ms: AtomicU64,
    timeout_ms: AtomicU64,
    connection_active: AtomicBool,
}

impl SyncConfig {
    pub fn new(settings: &MatchSettings) -> Self {
        Self {
            frequency_ms: AtomicU64::new(settings.poll_frequency_ms),
            timeout_ms: AtomicU64::new(settings.request_timeout_ms),
            connection_active: AtomicBool::new(settings.connection_active),
        }
    }

    pub fn frequency_ms(&self) -> u64 {
        self.frequency_ms.load(Ordering::SeqCst)
    }

    pub fn set_frequency_ms(&self, frequency_ms: u64) {
        self.frequency_ms.store(frequency_ms, Ordering::SeqCst);
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.load(Ordering::SeqCst)
    }

    pub fn set_timeout_ms(&self, timeout_ms: u64) {
        self.timeout_ms.store(timeout_ms, Ordering::SeqCst);
    }

    pub fn connection_active(&self) -> bool {
        self.connection_active.load(Ordering::SeqCst)
    }

    pub fn set_connection_active(&self, active: bool) {
        self.connection_active.store(active, Ordering::SeqCst);
    }
}
