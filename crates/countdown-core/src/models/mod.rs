pub mod config;
pub mod ids;
pub mod project;
pub mod timer;

pub use config::{ApiConfig, Config, ConfigOverrides, PollConfig, PushConfig};
pub use ids::{ProjectId, TimerId};
pub use project::{Project, ProjectSelection, TimerDraft};
pub use timer::{format_clock, RunState, TimerPayload, TimerSnapshot, TimerStatus};
