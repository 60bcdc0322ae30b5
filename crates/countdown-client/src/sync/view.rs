use countdown_core::models::{RunState, TimerSnapshot};

/// Push channel state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Disconnected,
    Connecting,
    Joined,
    /// Push is unavailable; REST fetch and poll are the only sources.
    Degraded,
    Closed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Disconnected => "disconnected",
            SyncState::Connecting => "connecting",
            SyncState::Joined => "joined",
            SyncState::Degraded => "degraded",
            SyncState::Closed => "closed",
        }
    }
}

/// What a viewer of one timer sees.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerView {
    pub snapshot: TimerSnapshot,
    pub run_state: RunState,
    /// A control call is in flight.
    pub is_loading: bool,
    pub is_selected: bool,
    /// Last control-call or refresh failure.
    pub error: Option<String>,
    /// Passive push-channel warning. Never blocks the display.
    pub connection_warning: Option<String>,
    pub sync_state: SyncState,
    pub deleted: bool,
}

impl TimerView {
    pub fn new(snapshot: TimerSnapshot) -> Self {
        let run_state = derive_run_state(&snapshot);
        Self {
            snapshot,
            run_state,
            is_loading: false,
            is_selected: false,
            error: None,
            connection_warning: None,
            sync_state: SyncState::Disconnected,
            deleted: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.run_state.is_paused()
    }

    /// Replace the snapshot with authoritative server state.
    pub(crate) fn replace_snapshot(&mut self, snapshot: TimerSnapshot) {
        self.run_state = derive_run_state(&snapshot);
        self.snapshot = snapshot;
    }
}

/// The server only reports `paused`. A paused timer with its full duration
/// left has never run since creation or its last reset.
pub fn derive_run_state(snapshot: &TimerSnapshot) -> RunState {
    if snapshot.is_running() {
        RunState::Running
    } else if snapshot.remaining_seconds == snapshot.duration {
        RunState::Idle
    } else {
        RunState::Paused
    }
}
