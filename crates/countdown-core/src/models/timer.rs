use serde::{Deserialize, Serialize};

use super::TimerId;

/// Timer state as the server sends it, in REST bodies and `timer_update`
/// push events alike. Only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPayload {
    pub id: TimerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

impl TimerPayload {
    pub fn new(id: impl Into<TimerId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            duration: None,
            remaining_seconds: None,
            paused: None,
        }
    }
}

/// Last known authoritative state of one timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TimerPayload")]
pub struct TimerSnapshot {
    pub id: TimerId,
    pub name: String,
    pub description: String,
    pub duration: u64,
    pub remaining_seconds: u64,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Running,
    Paused,
    Finished,
}

/// Client-side run state. Unlike the server's `paused` flag it can express
/// a fresh or freshly reset timer that is neither running nor paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerSnapshot {
    /// A timer that has not been started yet.
    pub fn new(id: impl Into<TimerId>, name: impl Into<String>, duration: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            duration,
            remaining_seconds: duration,
            paused: true,
        }
    }

    pub fn from_payload(payload: TimerPayload) -> Self {
        let duration = payload
            .duration
            .or(payload.remaining_seconds)
            .unwrap_or_default();
        let remaining_seconds = payload.remaining_seconds.unwrap_or(duration);

        Self {
            id: payload.id,
            name: payload.name.unwrap_or_default(),
            description: payload.description.unwrap_or_default(),
            duration: duration.max(remaining_seconds),
            remaining_seconds,
            paused: payload.paused.unwrap_or(true),
        }
    }

    /// Replace every field present in `payload`, keep the rest.
    ///
    /// The caller is responsible for matching ids.
    pub fn merge(&mut self, payload: &TimerPayload) {
        if let Some(ref name) = payload.name {
            self.name = name.clone();
        }
        if let Some(ref description) = payload.description {
            self.description = description.clone();
        }
        if let Some(duration) = payload.duration {
            self.duration = duration;
        }
        if let Some(remaining) = payload.remaining_seconds {
            self.remaining_seconds = remaining;
        }
        if let Some(paused) = payload.paused {
            self.paused = paused;
        }

        self.duration = self.duration.max(self.remaining_seconds);
    }

    pub fn is_running(&self) -> bool {
        !self.paused
    }

    /// Ended is derived from the remaining time, never stored.
    pub fn is_ended(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.duration.saturating_sub(self.remaining_seconds)
    }

    pub fn progress_percent(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        let progress = self.elapsed_seconds() as f64 / self.duration as f64 * 100.0;
        progress.clamp(0.0, 100.0)
    }

    pub fn status(&self) -> TimerStatus {
        if self.is_ended() {
            TimerStatus::Finished
        } else if self.is_running() {
            TimerStatus::Running
        } else {
            TimerStatus::Paused
        }
    }
}

impl From<TimerPayload> for TimerSnapshot {
    fn from(payload: TimerPayload) -> Self {
        Self::from_payload(payload)
    }
}

/// A snapshot is a payload with every field present.
impl From<TimerSnapshot> for TimerPayload {
    fn from(snapshot: TimerSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: Some(snapshot.name),
            description: Some(snapshot.description),
            duration: Some(snapshot.duration),
            remaining_seconds: Some(snapshot.remaining_seconds),
            paused: Some(snapshot.paused),
        }
    }
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Running => "Running",
            TimerStatus::Paused => "Paused",
            TimerStatus::Finished => "Finished",
        }
    }
}

impl RunState {
    pub fn from_paused(paused: bool) -> Self {
        if paused {
            RunState::Paused
        } else {
            RunState::Running
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, RunState::Paused)
    }
}

/// `HH:MM:SS`; hours keep growing past 99.
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
