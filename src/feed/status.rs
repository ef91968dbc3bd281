use crate::entity::TrackedEntity;
use crate::error::FeedError;
use crate::protocol::PortConnection;
use crate::snapshot::{BatchOutcome, ParsedBatch, Snapshot, SnapshotView};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or stopped
    Idle,
    Connecting,
    Open,
    Closed,
    Error,
}

/// Connection status as seen by consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub state: ConnectionState,
    /// Why the channel closed or failed, or the last server notice
    pub reason: Option<String>,
    /// Same error the view carries; `None` while healthy
    pub error: Option<FeedError>,
    pub last_updated: Option<DateTime<Utc>>,
    pub connected: bool,
}

/// Everything a consumer needs to render the feed
#[derive(Debug, Clone)]
pub struct FeedView {
    pub vessels: Vec<TrackedEntity>,
    pub port_connections: Vec<PortConnection>,
    /// True until the first data arrives from either channel
    pub loading: bool,
    pub error: Option<FeedError>,
    pub connected: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// State shared between a controller and its worker.
///
/// Only the worker for the current `epoch` may change anything; writes from
/// a superseded worker are dropped by the controller's update guard.
#[derive(Debug, Clone)]
pub struct FeedState {
    snapshot: Snapshot,
    state: ConnectionState,
    reason: Option<String>,
    error: Option<FeedError>,
    loading: bool,
    populated: bool,
    pub(crate) epoch: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            snapshot: Snapshot::new(),
            state: ConnectionState::Idle,
            reason: None,
            error: None,
            loading: false,
            populated: false,
            epoch: 0,
        }
    }
}

impl FeedState {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether any data has ever been applied
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            state: self.state,
            reason: self.reason.clone(),
            error: self.error.clone(),
            last_updated: self.snapshot.last_updated(),
            connected: self.is_connected(),
        }
    }

    pub fn snapshot_view(&self) -> SnapshotView {
        self.snapshot.view()
    }

    pub fn view(&self) -> FeedView {
        FeedView {
            vessels: self.snapshot.renderable(),
            port_connections: self.snapshot.port_connections().to_vec(),
            loading: self.loading,
            error: self.error.clone(),
            connected: self.is_connected(),
            last_updated: self.snapshot.last_updated(),
        }
    }

    pub(crate) fn begin(&mut self) {
        self.state = ConnectionState::Connecting;
        self.reason = None;
        self.error = None;
        self.loading = !self.populated;
    }

    pub(crate) fn mark_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub(crate) fn mark_open(&mut self) {
        self.state = ConnectionState::Open;
        self.reason = None;
        self.error = None;
    }

    pub(crate) fn mark_closed(&mut self, reason: Option<String>) {
        self.state = ConnectionState::Closed;
        self.reason = reason;
        if matches!(self.error, Some(FeedError::Server(_))) {
            self.error = None;
        }
    }

    pub(crate) fn mark_failed(&mut self, error: FeedError) {
        self.state = ConnectionState::Error;
        self.reason = Some(error.to_string());
        self.error = Some(error);
    }

    /// Apply a push batch: wholesale replace, connections when present.
    pub(crate) fn apply_batch(
        &mut self,
        batch: ParsedBatch,
        port_connections: Option<Vec<PortConnection>>,
        now: DateTime<Utc>,
    ) -> BatchOutcome {
        let outcome = self.snapshot.replace_with(batch, now);
        if let Some(connections) = port_connections {
            self.snapshot.set_port_connections(connections);
        }
        self.populated = true;
        self.loading = false;
        if matches!(self.error, Some(FeedError::Server(_))) {
            self.error = None;
            self.reason = None;
        }
        outcome
    }

    /// Server notice over an open channel; the connection state is unchanged.
    pub(crate) fn server_notice(&mut self, message: String) {
        self.reason = Some(message.clone());
        self.error = Some(FeedError::Server(message));
    }

    /// Apply a successful pull. An empty result never wipes a populated
    /// snapshot; port connections are left as they were.
    pub(crate) fn apply_pull(&mut self, batch: ParsedBatch, now: DateTime<Utc>) -> Option<BatchOutcome> {
        self.loading = false;
        if matches!(self.error, Some(FeedError::Pull(_))) {
            self.error = None;
        }
        if batch.is_empty() && self.populated {
            return None;
        }
        let outcome = self.snapshot.replace_with(batch, now);
        self.populated = true;
        Some(outcome)
    }

    pub(crate) fn pull_failed(&mut self, error: FeedError) {
        self.loading = false;
        if !self.populated {
            self.error = Some(error);
        }
    }

    pub(crate) fn stop(&mut self) {
        self.state = ConnectionState::Idle;
        self.reason = None;
        self.error = None;
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(records: serde_json::Value) -> ParsedBatch {
        let records = records.as_array().cloned().unwrap_or_default();
        ParsedBatch::from_records(&records, Utc::now())
    }

    #[test]
    fn test_initial_state_is_idle() {
        let state = FeedState::default();
        assert_eq!(state.state(), ConnectionState::Idle);
        assert!(!state.is_loading());
        assert!(!state.is_connected());
        assert!(state.status().last_updated.is_none());
    }

    #[test]
    fn test_begin_sets_loading_until_first_batch() {
        let mut state = FeedState::default();
        state.begin();
        assert_eq!(state.state(), ConnectionState::Connecting);
        assert!(state.is_loading());

        state.mark_open();
        state.apply_batch(parsed(json!([{"id": 1, "currentLat": 1, "currentLng": 1}])), None, Utc::now());
        assert!(!state.is_loading());
        assert!(state.is_populated());

        // A restart with data already on screen does not show loading again
        state.begin();
        assert!(!state.is_loading());
    }

    #[test]
    fn test_server_notice_keeps_state_and_clears_on_next_batch() {
        let mut state = FeedState::default();
        state.begin();
        state.mark_open();
        state.server_notice("region unavailable".to_string());

        assert_eq!(state.state(), ConnectionState::Open);
        assert_eq!(state.reason(), Some("region unavailable"));
        assert_eq!(
            state.error(),
            Some(&FeedError::Server("region unavailable".to_string()))
        );

        state.apply_batch(parsed(json!([])), None, Utc::now());
        assert!(state.error().is_none());
        assert!(state.reason().is_none());
    }

    #[test]
    fn test_failure_sets_error_and_open_clears_it() {
        let mut state = FeedState::default();
        state.begin();
        state.mark_failed(FeedError::Transport("connection refused".to_string()));

        assert_eq!(state.state(), ConnectionState::Error);
        assert!(state.reason().unwrap().contains("connection refused"));
        assert!(matches!(state.error(), Some(FeedError::Transport(_))));

        let status = state.status();
        assert!(!status.connected);
        assert_eq!(
            status.error,
            Some(FeedError::Transport("connection refused".to_string()))
        );
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["error"]["kind"], "transport");
        assert_eq!(value["error"]["message"], "connection refused");

        state.mark_connecting();
        assert!(state.error().is_some());

        state.mark_open();
        assert!(state.error().is_none());
        assert!(state.is_connected());
        assert!(state.status().error.is_none());
    }

    #[test]
    fn test_close_does_not_set_error() {
        let mut state = FeedState::default();
        state.begin();
        state.mark_open();
        state.mark_closed(Some("going away".to_string()));

        assert_eq!(state.state(), ConnectionState::Closed);
        assert_eq!(state.reason(), Some("going away"));
        assert!(state.error().is_none());
    }

    #[test]
    fn test_pull_failure_only_surfaces_without_data() {
        let mut state = FeedState::default();
        state.begin();
        state.pull_failed(FeedError::Pull("503".to_string()));
        assert!(matches!(state.error(), Some(FeedError::Pull(_))));
        assert!(!state.is_loading());

        let mut state = FeedState::default();
        state.begin();
        state.apply_batch(parsed(json!([{"id": 1, "currentLat": 1, "currentLng": 1}])), None, Utc::now());
        state.pull_failed(FeedError::Pull("503".to_string()));
        assert!(state.error().is_none());
        assert_eq!(state.snapshot().raw_count(), 1);
    }

    #[test]
    fn test_empty_pull_keeps_populated_snapshot() {
        let mut state = FeedState::default();
        state.begin();
        state.apply_batch(parsed(json!([{"id": 1, "currentLat": 1, "currentLng": 1}])), None, Utc::now());

        assert!(state.apply_pull(parsed(json!([])), Utc::now()).is_none());
        assert_eq!(state.snapshot().raw_count(), 1);

        let outcome = state
            .apply_pull(parsed(json!([{"id": 2, "currentLat": 2, "currentLng": 2}])), Utc::now())
            .unwrap();
        assert_eq!(outcome.total, 1);
        assert!(state.snapshot().get(&crate::entity::EntityId::Number(1)).is_none());
    }

    #[test]
    fn test_stop_keeps_snapshot() {
        let mut state = FeedState::default();
        state.begin();
        state.mark_open();
        state.apply_batch(parsed(json!([{"id": 1, "currentLat": 1, "currentLng": 1}])), None, Utc::now());
        state.stop();

        assert_eq!(state.state(), ConnectionState::Idle);
        assert_eq!(state.view().vessels.len(), 1);
        assert!(!state.view().connected);
    }
}
