//! Match synchronizer: state handle for the game loop plus the background
//! polling task that exchanges parameters and events with the backend.

use crate::config::{MatchSettings, SyncConfig};
use crate::scripts::{ScriptKind, ScriptRegistry};
use crate::state::{MatchEvent, Parameter, SyncState};
use crate::transport::{HttpTransport, Transport};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::interval;

/// Cloneable handle to one match's synchronized state.
///
/// One clone is handed to the background polling loop (spawned with
/// [`start`](MatchSynchronizer::start) or driven directly with
/// [`run`](MatchSynchronizer::run)); the others stay with the game loop, which
/// reads and mutates state through the accessor methods. All shared state
/// lives behind a mutex and every accessor works on a consistent snapshot;
/// the polling loop never holds the lock across network I/O.
#[derive(Debug, Clone)]
pub struct MatchSynchronizer {
    match_id: u32,
    assigned_player: u32,
    opposite_player: u32,
    host_url: String,
    unlimited_collection: bool,
    scripts: ScriptRegistry,
    config: Arc<SyncConfig>,
    state: Arc<Mutex<SyncState>>,
}

impl MatchSynchronizer {
    pub fn new(settings: MatchSettings) -> Self {
        let opposite_player = if settings.assigned_player == 1 { 2 } else { 1 };
        let config = Arc::new(SyncConfig::new(&settings));

        Self {
            match_id: settings.match_id,
            assigned_player: settings.assigned_player,
            opposite_player,
            host_url: settings.host_url,
            unlimited_collection: settings.unlimited_collection,
            scripts: ScriptRegistry,
            config,
            state: Arc::new(Mutex::new(SyncState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        // A panic while holding the lock leaves the state usable enough to
        // keep polling, so poisoning is ignored.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // IDENTITY

    pub fn match_id(&self) -> u32 {
        self.match_id
    }

    pub fn assigned_player(&self) -> u32 {
        self.assigned_player
    }

    pub fn opposite_player(&self) -> u32 {
        self.opposite_player
    }

    // CONFIGURATION

    /// Sets the pause between loop iterations, in milliseconds. Takes effect
    /// on the next iteration.
    pub fn set_frequency(&self, frequency_ms: u64) {
        self.config.set_frequency_ms(frequency_ms);
    }

    pub fn frequency(&self) -> u64 {
        self.config.frequency_ms()
    }

    /// Activates or deactivates the connection. Deactivating stops the
    /// polling loop between iterations; an in-flight request is not
    /// interrupted and pending unsent events are abandoned.
    pub fn set_connection_active(&self, active: bool) {
        self.config.set_connection_active(active);
    }

    pub fn is_connection_active(&self) -> bool {
        self.config.connection_active()
    }

    /// Sets the per-request timeout, in milliseconds.
    pub fn set_request_timeout(&self, timeout_ms: u64) {
        self.config.set_timeout_ms(timeout_ms);
    }

    pub fn request_timeout(&self) -> u64 {
        self.config.timeout_ms()
    }

    // SYNCHRONIZATION FLAGS

    /// True unless an exchange cycle is currently executing.
    pub fn update_complete(&self) -> bool {
        self.lock().update_complete
    }

    /// Returns true exactly once per completed exchange cycle; subsequent
    /// calls return false until the next cycle completes.
    pub fn has_new_data(&self) -> bool {
        let mut state = self.lock();
        if state.has_new_data {
            state.has_new_data = false;
            true
        } else {
            false
        }
    }

    /// Number of exchange cycles run so far.
    pub fn update_count(&self) -> u32 {
        self.lock().updates
    }

    /// Requests one exchange cycle on the loop's next iteration. The flag is
    /// edge-triggered: the loop clears it after acting on it. Meaningful only
    /// when `unlimited_collection` is false.
    pub fn request_update(&self) {
        self.lock().should_update = true;
    }

    // PARAMETERS

    /// Creates a new synchronized parameter and returns its key. Keys start
    /// at 0 and increase by 1 per call; they are never reused, even after
    /// [`remove_parameter`](MatchSynchronizer::remove_parameter).
    pub fn create_parameter(&self, name: &str, value: &str) -> u32 {
        let mut state = self.lock();
        let key = state.next_param_key;
        state.next_param_key += 1;
        state.parameters.push(Parameter {
            key,
            name: name.to_string(),
            value: value.to_string(),
        });
        key
    }

    /// Removes the parameter with the given key. Silently does nothing when
    /// the key is unknown.
    pub fn remove_parameter(&self, key: u32) {
        let mut state = self.lock();
        if let Some(pos) = state.parameters.iter().position(|p| p.key == key) {
            state.parameters.remove(pos);
        }
    }

    /// Looks up a parameter's current value by key.
    pub fn parameter_value(&self, key: u32) -> Option<String> {
        self.lock()
            .parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.clone())
    }

    /// Snapshot of the full parameter list.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.lock().parameters.clone()
    }

    // EVENTS

    /// Queues an outbound event and returns its sender-assigned index.
    /// Queued events drain to the backend at one per exchange cycle.
    pub fn raise_event(&self, kind: u32) -> u32 {
        let mut state = self.lock();
        let index = state.next_event_index;
        state.next_event_index += 1;
        state.local_unsent_events.push_back(MatchEvent { index, kind });
        index
    }

    /// Number of outbound events waiting to be sent.
    pub fn pending_event_count(&self) -> usize {
        self.lock().local_unsent_events.len()
    }

    /// Index of the last outbound event handed to the backend, 0 if none yet.
    pub fn last_sent_event_index(&self) -> u32 {
        self.lock().last_sent_local_event_index
    }

    /// The most recent event received from the opposing player, if any.
    pub fn remote_active_event(&self) -> Option<MatchEvent> {
        self.lock().remote_active_event
    }

    // READINESS

    pub fn is_local_player_ready(&self) -> bool {
        self.lock().local_player_ready
    }

    pub fn is_remote_player_ready(&self) -> bool {
        self.lock().remote_player_ready
    }

    // POLLING LOOP

    /// Spawns the polling loop on the current tokio runtime using the default
    /// HTTP transport.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move {
            let transport = HttpTransport::new();
            sync.run(&transport).await;
        })
    }

    /// Runs the polling loop until the connection is deactivated.
    ///
    /// The loop first announces local readiness, then waits for the remote
    /// player to become ready, then exchanges data: on every iteration when
    /// `unlimited_collection` is set, otherwise once per
    /// [`request_update`](MatchSynchronizer::request_update).
    pub async fn run<T: Transport>(&self, transport: &T) {
        info!(
            "Synchronizer starting for match {} as player {}",
            self.match_id, self.assigned_player
        );

        self.notify_local_ready(transport).await;

        let mut period = self.config.frequency_ms().max(1);
        let mut ticker = interval(Duration::from_millis(period));

        while self.config.connection_active() {
            ticker.tick().await;

            if !self.is_remote_player_ready() {
                self.check_remote_ready(transport).await;
            } else if self.begin_cycle() {
                self.exchange_cycle(transport).await;
                self.finish_cycle();
            }

            let frequency = self.config.frequency_ms().max(1);
            if frequency != period {
                period = frequency;
                ticker = interval(Duration::from_millis(period));
            }
        }

        info!("Synchronizer stopped for match {}", self.match_id);
    }

    /// Marks the start of an exchange cycle if one is due. Returns false when
    /// neither `unlimited_collection` nor a pending update request asks for
    /// one.
    fn begin_cycle(&self) -> bool {
        let mut state = self.lock();
        if !(self.unlimited_collection || state.should_update) {
            return false;
        }
        state.updates += 1;
        state.update_complete = false;
        true
    }

    fn finish_cycle(&self) {
        let mut state = self.lock();
        state.should_update = false;
        state.update_complete = true;
        state.has_new_data = true;
    }

    /// One full exchange with the backend: four sequential requests, no
    /// atomicity across them. Any failed step is skipped for this cycle.
    async fn exchange_cycle<T: Transport>(&self, transport: &T) {
        self.send_local_params(transport).await;
        self.retrieve_remote_params(transport).await;
        self.send_local_event(transport).await;
        self.retrieve_remote_event(transport).await;
    }

    async fn fetch<T: Transport>(&self, transport: &T, url: &str) -> Option<String> {
        let timeout = Duration::from_millis(self.config.timeout_ms());
        match transport.fetch(url, timeout).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("match {}: request failed: {}", self.match_id, e);
                None
            }
        }
    }

    /// One-time, fire-and-forget readiness announcement.
    async fn notify_local_ready<T: Transport>(&self, transport: &T) {
        let url = format!(
            "{}{}?matchId={}&player={}&ready=1",
            self.host_url,
            self.scripts.filename(ScriptKind::Connect),
            self.match_id,
            self.assigned_player
        );
        self.fetch(transport, &url).await;
        self.lock().local_player_ready = true;
    }

    async fn check_remote_ready<T: Transport>(&self, transport: &T) {
        let url = format!(
            "{}{}?matchId={}&player={}",
            self.host_url,
            self.scripts.filename(ScriptKind::CheckConnection),
            self.match_id,
            self.opposite_player
        );

        if let Some(body) = self.fetch(transport, &url).await {
            // The script pads its output, only the first character counts.
            if body.chars().next() == Some('1') {
                self.lock().remote_player_ready = true;
                info!("match {}: remote player ready", self.match_id);
            }
        }
    }

    async fn send_local_params<T: Transport>(&self, transport: &T) {
        let params = self.parameters();
        let json = match serde_json::to_string(&params) {
            Ok(json) => json,
            Err(e) => {
                warn!("match {}: could not serialize parameters: {}", self.match_id, e);
                return;
            }
        };

        let url = format!(
            "{}{}?matchId={}&param={}",
            self.host_url,
            self.scripts.filename(ScriptKind::SendParam),
            self.match_id,
            json
        );
        self.fetch(transport, &url).await;
    }

    async fn retrieve_remote_params<T: Transport>(&self, transport: &T) {
        let url = format!(
            "{}{}?matchId={}",
            self.host_url,
            self.scripts.filename(ScriptKind::RetrieveParam),
            self.match_id
        );

        if let Some(body) = self.fetch(transport, &url).await {
            match serde_json::from_str::<Vec<Parameter>>(&body) {
                // The server copy replaces the local list wholesale: last
                // writer on the wire wins, no merging.
                Ok(params) => self.lock().parameters = params,
                Err(e) => warn!(
                    "match {}: discarding malformed parameter payload: {}",
                    self.match_id, e
                ),
            }
        }
    }

    /// Sends the oldest queued event, if any. At most one event leaves the
    /// queue per cycle; it is dropped from the queue even when the request
    /// fails.
    async fn send_local_event<T: Transport>(&self, transport: &T) {
        let head = self.lock().local_unsent_events.front().copied();
        let Some(event) = head else {
            return;
        };

        let url = format!(
            "{}{}?matchId={}&player={}&event={}&eventIndex={}",
            self.host_url,
            self.scripts.filename(ScriptKind::SendEvent),
            self.match_id,
            self.assigned_player,
            event.kind,
            event.index
        );
        self.fetch(transport, &url).await;

        let mut state = self.lock();
        state.last_sent_local_event_index = event.index;
        state.local_unsent_events.pop_front();
        debug!(
            "match {}: sent event {} (kind {})",
            self.match_id, event.index, event.kind
        );
    }

    async fn retrieve_remote_event<T: Transport>(&self, transport: &T) {
        let url = format!(
            "{}{}?matchId={}&player={}",
            self.host_url,
            self.scripts.filename(ScriptKind::RetrieveEvent),
            self.match_id,
            self.opposite_player
        );

        let Some(body) = self.fetch(transport, &url).await else {
            return;
        };

        // The script answers "null" when the opponent has no event yet.
        match serde_json::from_str::<Option<MatchEvent>>(&body) {
            Ok(Some(event)) => {
                let applied = self.lock().apply_remote_event(event);
                if applied {
                    debug!(
                        "match {}: applied remote event {} (kind {})",
                        self.match_id, event.index, event.kind
                    );
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                "match {}: discarding malformed event payload: {}",
                self.match_id, e
            ),
        }
    }
}
