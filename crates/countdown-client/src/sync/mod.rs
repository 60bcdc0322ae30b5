//! Timer sync client
//!
//! Keeps an eventually consistent view of a timer from three sources: the
//! initial REST fetch, the push channel, and (for the selected-timer
//! display) periodic polling of the project's selection pointer.

mod reconcile;
mod selected;
mod subscription;
mod view;

pub use reconcile::{PollOutcome, PollTicket, Reconciler};
pub use selected::{
    SelectedTimerHandle, SelectedTimerWatcher, SelectedView, LOAD_FAILED_MESSAGE,
    NO_SELECTION_MESSAGE,
};
pub use subscription::{MountOptions, TimerSubscription, CONNECTION_WARNING};
pub use view::{derive_run_state, SyncState, TimerView};
