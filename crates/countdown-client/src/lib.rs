//! Countdown Client Library
//!
//! Talks to the countdown timer service: a REST control API for commands and
//! a Socket.IO push channel for live `timer_update` events. The [`sync`]
//! module merges both sources into one eventually consistent view per timer.

pub mod api;
pub mod board;
pub mod error;
pub mod push;
pub mod sync;

pub use api::{ControlApi, HttpControlApi};
pub use board::ProjectBoard;
pub use error::{ClientError, Result};
pub use push::{JoinRequest, PushConnection, PushEvent, PushTransport, SocketIoTransport};
pub use sync::{
    MountOptions, SelectedTimerHandle, SelectedTimerWatcher, SelectedView, SyncState,
    TimerSubscription, TimerView,
};
