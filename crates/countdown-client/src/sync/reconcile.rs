//! Snapshot reconciliation.
//!
//! Push events, poll results and local control-call outcomes all funnel
//! through one [`Reconciler`]. Writes are ordered by arrival: each applied
//! write takes the next sequence number, and a poll result is only applied
//! if no other write landed after its request went out.

use countdown_core::models::{TimerId, TimerPayload};

use super::view::{SyncState, TimerView};

/// Issued before a poll request goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    /// A newer write arrived while the poll was in flight.
    Stale,
    /// The poll returned a different timer. Nothing was applied.
    Switched,
    Closed,
}

#[derive(Debug)]
pub struct Reconciler {
    view: TimerView,
    seq: u64,
    last_write: u64,
    closed: bool,
}

impl Reconciler {
    pub fn new(view: TimerView) -> Self {
        Self {
            view,
            seq: 0,
            last_write: 0,
            closed: false,
        }
    }

    pub fn timer_id(&self) -> &TimerId {
        &self.view.snapshot.id
    }

    pub fn view(&self) -> &TimerView {
        &self.view
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop accepting writes. Irreversible.
    pub fn close(&mut self) {
        self.closed = true;
        self.view.sync_state = SyncState::Closed;
        self.view.is_loading = false;
    }

    fn record_write(&mut self) {
        self.seq += 1;
        self.last_write = self.seq;
    }

    /// Merge a push update. Updates for any other timer id are ignored.
    pub fn apply_push(&mut self, payload: &TimerPayload) -> bool {
        if self.closed || payload.id != self.view.snapshot.id {
            return false;
        }

        self.merge(payload);
        true
    }

    /// Fields absent from `payload` keep their last known value.
    fn merge(&mut self, payload: &TimerPayload) {
        let mut snapshot = self.view.snapshot.clone();
        snapshot.merge(payload);
        self.view.replace_snapshot(snapshot);
        self.record_write();
    }

    pub fn begin_poll(&mut self) -> PollTicket {
        self.seq += 1;
        PollTicket { seq: self.seq }
    }

    pub fn apply_poll(&mut self, ticket: PollTicket, payload: &TimerPayload) -> PollOutcome {
        if self.closed {
            return PollOutcome::Closed;
        }
        if payload.id != self.view.snapshot.id {
            return PollOutcome::Switched;
        }
        if self.last_write > ticket.seq {
            return PollOutcome::Stale;
        }

        self.merge(payload);
        self.view.error = None;
        PollOutcome::Applied
    }

    /// Local state write, such as the optimistic outcome of a control call.
    /// Counts as an arrival for poll staleness.
    pub fn apply_local(&mut self, f: impl FnOnce(&mut TimerView)) -> bool {
        if self.closed {
            return false;
        }
        f(&mut self.view);
        self.record_write();
        true
    }

    /// Presentation-only change (loading flag, messages, sync state).
    pub fn set_flags(&mut self, f: impl FnOnce(&mut TimerView)) -> bool {
        if self.closed {
            return false;
        }
        f(&mut self.view);
        true
    }

    /// Server-confirmed state from a control call.
    pub fn apply_response(&mut self, payload: &TimerPayload) -> bool {
        if self.closed || payload.id != self.view.snapshot.id {
            return false;
        }
        self.merge(payload);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::view::derive_run_state;
    use countdown_core::models::{RunState, TimerSnapshot};

    fn reconciler(id: &str) -> Reconciler {
        Reconciler::new(TimerView::new(TimerSnapshot::new(id, "Talk", 600)))
    }

    fn remaining(id: &str, seconds: u64) -> TimerPayload {
        TimerPayload {
            remaining_seconds: Some(seconds),
            paused: Some(false),
            ..TimerPayload::new(id)
        }
    }

    #[test]
    fn test_push_for_other_timer_is_ignored() {
        let mut r = reconciler("7");
        let before = r.view().clone();

        assert!(!r.apply_push(&remaining("5", 10)));
        assert_eq!(r.view(), &before);
    }

    #[test]
    fn test_push_merges_partial_payload() {
        let mut r = reconciler("7");
        assert!(r.apply_push(&remaining("7", 420)));

        let view = r.view();
        assert_eq!(view.snapshot.remaining_seconds, 420);
        assert_eq!(view.snapshot.name, "Talk");
        assert_eq!(view.run_state, RunState::Running);
        assert_eq!(derive_run_state(&view.snapshot), view.run_state);
    }

    #[test]
    fn test_poll_applies_when_nothing_newer() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();

        let mut polled = TimerSnapshot::new("7", "Talk (renamed)", 600);
        polled.remaining_seconds = 300;
        assert_eq!(r.apply_poll(ticket, &polled.into()), PollOutcome::Applied);
        assert_eq!(r.view().snapshot.name, "Talk (renamed)");
        assert_eq!(r.view().run_state, RunState::Paused);
    }

    #[test]
    fn test_poll_older_than_push_is_stale() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();

        r.apply_push(&remaining("7", 100));

        let polled = TimerPayload {
            remaining_seconds: Some(110),
            ..TimerPayload::new("7")
        };
        assert_eq!(r.apply_poll(ticket, &polled), PollOutcome::Stale);
        assert_eq!(r.view().snapshot.remaining_seconds, 100);
    }

    #[test]
    fn test_push_for_other_timer_does_not_stale_poll() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();

        r.apply_push(&remaining("5", 100));
        assert_eq!(
            r.apply_poll(ticket, &TimerPayload::new("7")),
            PollOutcome::Applied
        );
    }

    #[test]
    fn test_poll_for_other_timer_is_switch() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();
        let polled: TimerPayload = TimerSnapshot::new("8", "Other", 60).into();

        assert_eq!(r.apply_poll(ticket, &polled), PollOutcome::Switched);
        assert_eq!(r.timer_id(), &TimerId::from(7));
    }

    #[test]
    fn test_closed_rejects_everything() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();
        r.close();

        assert!(!r.apply_push(&remaining("7", 1)));
        assert!(!r.apply_local(|v| v.is_selected = true));
        assert_eq!(
            r.apply_poll(ticket, &remaining("7", 1)),
            PollOutcome::Closed
        );
        assert_eq!(r.view().sync_state, SyncState::Closed);
        assert_eq!(r.view().snapshot.remaining_seconds, 600);
    }

    #[test]
    fn test_flags_do_not_stale_polls() {
        let mut r = reconciler("7");
        let ticket = r.begin_poll();
        r.set_flags(|v| v.is_loading = true);

        assert_eq!(
            r.apply_poll(ticket, &remaining("7", 590)),
            PollOutcome::Applied
        );
    }

    #[test]
    fn test_partial_poll_keeps_unreported_fields() {
        let mut snapshot = TimerSnapshot::new("7", "Talk", 600);
        snapshot.description = "Main stage".to_string();
        snapshot.paused = false;
        snapshot.remaining_seconds = 500;
        let mut r = Reconciler::new(TimerView::new(snapshot));

        let ticket = r.begin_poll();
        let polled = TimerPayload {
            name: Some("Talk".to_string()),
            remaining_seconds: Some(480),
            ..TimerPayload::new("7")
        };
        assert_eq!(r.apply_poll(ticket, &polled), PollOutcome::Applied);

        let view = r.view();
        assert_eq!(view.snapshot.description, "Main stage");
        assert_eq!(view.snapshot.duration, 600);
        assert_eq!(view.snapshot.remaining_seconds, 480);
        assert_eq!(view.run_state, RunState::Running);
    }
}
