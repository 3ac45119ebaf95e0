//! Synchronized match data types and the shared mutable synchronizer state.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A named string value synchronized through the match backend.
///
/// Keys are assigned locally, increase monotonically from 0 and are never
/// reused, even after a parameter is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: u32,
    pub name: String,
    pub value: String,
}

/// A discrete game event, ordered by its sender-assigned index.
///
/// On the wire the kind travels as `"type"`, matching the backend scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub index: u32,
    #[serde(rename = "type")]
    pub kind: u32,
}

/// Mutable state shared between caller threads and the polling loop.
#[derive(Debug)]
pub(crate) struct SyncState {
    pub parameters: Vec<Parameter>,
    pub next_param_key: u32,

    pub local_unsent_events: VecDeque<MatchEvent>,
    pub next_event_index: u32,
    pub last_sent_local_event_index: u32,

    pub remote_event_index: u32,
    pub remote_active_event: Option<MatchEvent>,

    pub local_player_ready: bool,
    pub remote_player_ready: bool,

    pub should_update: bool,
    pub update_complete: bool,
    pub has_new_data: bool,
    pub updates: u32,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
            next_param_key: 0,
            local_unsent_events: VecDeque::new(),
            // Index 0 means "nothing applied yet" on the receiving side, so
            // outbound indices start at 1.
            next_event_index: 1,
            last_sent_local_event_index: 0,
            remote_event_index: 0,
            remote_active_event: None,
            local_player_ready: false,
            remote_player_ready: false,
            should_update: false,
            update_complete: true,
            has_new_data: false,
            updates: 0,
        }
    }

    /// Applies a remote event record only if its index is strictly greater
    /// than anything applied so far. Stale or duplicate records are discarded.
    /// Returns whether the record was applied.
    pub fn apply_remote_event(&mut self, event: MatchEvent) -> bool {
        if event.index > self.remote_event_index {
            self.remote_event_index = event.index;
            self.remote_active_event = Some(event);
            true
        } else {
            false
        }
    }
}
