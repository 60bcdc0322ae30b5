use countdown_core::models::{
    ProjectId, RunState, TimerDraft, TimerId, TimerPayload, TimerSnapshot,
};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::reconcile::{PollOutcome, PollTicket, Reconciler};
use super::view::{SyncState, TimerView};
use crate::api::ControlApi;
use crate::push::{JoinRequest, PushConnection, PushEvent, PushTransport, TransportError};
use crate::{ClientError, Result};

pub const CONNECTION_WARNING: &str = "Connection error. Timer updates may not be accurate.";

type ConnectResult = std::result::Result<PushConnection, TransportError>;

#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    /// Initial selection flag of the view.
    pub selected: bool,
}

struct Shared {
    reconciler: Mutex<Reconciler>,
    view_tx: watch::Sender<TimerView>,
}

impl Shared {
    /// Run `f` under the view lock and publish if it reports a change.
    fn apply<R>(&self, f: impl FnOnce(&mut Reconciler) -> (R, bool)) -> R {
        let mut reconciler = self
            .reconciler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (result, changed) = f(&mut reconciler);
        if changed {
            self.view_tx.send_replace(reconciler.view().clone());
        }
        result
    }

    fn with<R>(&self, f: impl FnOnce(&Reconciler) -> R) -> R {
        let reconciler = self
            .reconciler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&reconciler)
    }

    fn set_flags(&self, f: impl FnOnce(&mut TimerView)) -> bool {
        self.apply(|r| {
            let changed = r.set_flags(f);
            (changed, changed)
        })
    }

    fn apply_local(&self, f: impl FnOnce(&mut TimerView)) -> bool {
        self.apply(|r| {
            let changed = r.apply_local(f);
            (changed, changed)
        })
    }
}

/// Live view of one timer.
///
/// Combines the initial REST fetch with the push channel. The owner can feed
/// poll results in through [`TimerSubscription::begin_poll`] and
/// [`TimerSubscription::apply_poll`]. Closing is final.
pub struct TimerSubscription {
    project_id: ProjectId,
    timer_id: TimerId,
    api: Arc<dyn ControlApi>,
    shared: Arc<Shared>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSubscription {
    /// Fetch the timer while the push channel opens alongside.
    ///
    /// A failed fetch is a blocking error. The push connect never delays
    /// the snapshot: the view starts out [`SyncState::Connecting`] and
    /// moves to joined or degraded in the background.
    pub async fn mount(
        project_id: ProjectId,
        timer_id: TimerId,
        api: Arc<dyn ControlApi>,
        push: Option<Arc<dyn PushTransport>>,
        options: MountOptions,
    ) -> Result<Self> {
        let pending = push.map(|push| {
            PendingConnect::spawn(push, JoinRequest::new(project_id.clone(), timer_id.clone()))
        });

        let snapshot = match api.get_timer(&project_id, &timer_id).await {
            Ok(payload) => TimerSnapshot::from_payload(payload),
            Err(e) => {
                tracing::error!("Failed to load timer {}: {}", timer_id, e);
                if let Some(pending) = pending {
                    pending.cancel().await;
                }
                return Err(e);
            }
        };

        Ok(Self::from_parts(project_id, api, snapshot, pending, options))
    }

    /// Subscribe with an already fetched snapshot. The view is published
    /// immediately; the push channel joins in the background.
    pub fn mount_with_snapshot(
        project_id: ProjectId,
        snapshot: TimerSnapshot,
        api: Arc<dyn ControlApi>,
        push: Option<Arc<dyn PushTransport>>,
        options: MountOptions,
    ) -> Self {
        let pending = push.map(|push| {
            PendingConnect::spawn(push, JoinRequest::new(project_id.clone(), snapshot.id.clone()))
        });
        Self::from_parts(project_id, api, snapshot, pending, options)
    }

    fn from_parts(
        project_id: ProjectId,
        api: Arc<dyn ControlApi>,
        snapshot: TimerSnapshot,
        pending: Option<PendingConnect>,
        options: MountOptions,
    ) -> Self {
        let timer_id = snapshot.id.clone();
        let mut view = TimerView::new(snapshot);
        view.is_selected = options.selected;
        if pending.is_some() {
            view.sync_state = SyncState::Connecting;
        }

        let (view_tx, _) = watch::channel(view.clone());
        let shared = Arc::new(Shared {
            reconciler: Mutex::new(Reconciler::new(view)),
            view_tx,
        });

        let pump = pending.map(|pending| tokio::spawn(pump(shared.clone(), pending)));

        Self {
            project_id,
            timer_id,
            api,
            shared,
            pump: Mutex::new(pump),
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn timer_id(&self) -> &TimerId {
        &self.timer_id
    }

    /// Current view.
    pub fn view(&self) -> TimerView {
        self.shared.with(|r| r.view().clone())
    }

    /// Receiver that sees every published view change.
    pub fn subscribe(&self) -> watch::Receiver<TimerView> {
        self.shared.view_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.with(Reconciler::is_closed)
    }

    pub fn begin_poll(&self) -> PollTicket {
        self.shared.apply(|r| (r.begin_poll(), false))
    }

    pub fn apply_poll(&self, ticket: PollTicket, payload: &TimerPayload) -> PollOutcome {
        let outcome = self.shared.apply(|r| {
            let outcome = r.apply_poll(ticket, payload);
            (outcome, outcome == PollOutcome::Applied)
        });

        if outcome == PollOutcome::Stale {
            tracing::debug!("Discarded stale poll result for timer {}", self.timer_id);
        }
        outcome
    }

    /// Show a transient error without touching the snapshot.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.shared.set_flags(|v| v.error = Some(message));
    }

    /// Re-fetch the timer and apply it like a poll result.
    pub async fn refresh(&self) -> Result<PollOutcome> {
        self.ensure_open()?;
        let ticket = self.begin_poll();
        match self.api.get_timer(&self.project_id, &self.timer_id).await {
            Ok(payload) => Ok(self.apply_poll(ticket, &payload)),
            Err(e) => {
                self.set_error("Failed to load timer data");
                Err(e)
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.ensure_open()?;
        if self.view().is_running() {
            return Err(ClientError::InvalidState(
                "Timer is already running".to_string(),
            ));
        }

        let call = self.api.start_timer(&self.project_id, &self.timer_id);
        self.run("Failed to start timer", call, |view| {
            view.snapshot.paused = false;
            view.run_state = RunState::Running;
        })
        .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.ensure_open()?;
        if !self.view().is_running() {
            return Err(ClientError::InvalidState("Timer is not running".to_string()));
        }

        let call = self.api.pause_timer(&self.project_id, &self.timer_id);
        self.run("Failed to pause timer", call, |view| {
            view.snapshot.paused = true;
            view.run_state = RunState::Paused;
        })
        .await
    }

    /// Back to the full known duration, neither running nor paused.
    pub async fn reset(&self) -> Result<()> {
        self.ensure_open()?;
        let call = self.api.reset_timer(&self.project_id, &self.timer_id);
        self.run("Failed to reset timer", call, |view| {
            view.snapshot.remaining_seconds = view.snapshot.duration;
            view.snapshot.paused = true;
            view.run_state = RunState::Idle;
        })
        .await
    }

    /// Only flips this view's flag. Clearing any other timer's selection is
    /// the owning list's job.
    pub async fn select(&self) -> Result<()> {
        self.ensure_open()?;
        let call = self.api.select_timer(&self.project_id, &self.timer_id);
        self.run("Failed to select timer", call, |view| view.is_selected = true)
            .await
    }

    pub async fn deselect(&self) -> Result<()> {
        self.ensure_open()?;
        let call = self.api.deselect_timer(&self.project_id);
        self.run("Failed to deselect timer", call, |view| view.is_selected = false)
            .await
    }

    /// Edit the timer. The duration is parsed first; invalid input never
    /// reaches the server.
    pub async fn update(&self, name: &str, description: &str, duration_input: &str) -> Result<()> {
        self.ensure_open()?;

        let draft = match TimerDraft::from_input(name, description, duration_input) {
            Ok(draft) => draft,
            Err(message) => {
                self.shared.set_flags(|v| v.error = Some(message.clone()));
                return Err(ClientError::InvalidInput(message));
            }
        };

        self.shared.set_flags(|v| v.is_loading = true);
        match self
            .api
            .update_timer(&self.project_id, &self.timer_id, &draft)
            .await
        {
            Ok(response) => {
                // The server restarts the countdown from the new duration and
                // may echo back only some fields.
                let edited = TimerPayload {
                    name: Some(draft.name.clone()),
                    description: Some(draft.description.clone()),
                    duration: Some(draft.duration),
                    remaining_seconds: Some(draft.duration),
                    ..TimerPayload::new(self.timer_id.clone())
                };
                self.shared.apply(|r| {
                    r.apply_response(&edited);
                    r.apply_response(&response);
                    r.set_flags(|v| {
                        v.is_loading = false;
                        v.error = None;
                    });
                    ((), true)
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to update timer {}: {}", self.timer_id, e);
                self.shared.set_flags(|v| {
                    v.is_loading = false;
                    v.error = Some("Failed to update timer".to_string());
                });
                Err(e)
            }
        }
    }

    /// Delete the timer. On success the subscription is closed.
    pub async fn delete(&self) -> Result<()> {
        self.ensure_open()?;

        self.shared.set_flags(|v| v.is_loading = true);
        match self.api.delete_timer(&self.project_id, &self.timer_id).await {
            Ok(()) => {
                self.shared.apply(|r| {
                    r.set_flags(|v| v.deleted = true);
                    r.close();
                    ((), true)
                });
                self.stop_pump().await;
                tracing::info!("Deleted timer {}", self.timer_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to delete timer {}: {}", self.timer_id, e);
                self.shared.set_flags(|v| {
                    v.is_loading = false;
                    v.error = Some("Failed to delete timer".to_string());
                });
                Err(e)
            }
        }
    }

    /// Tear down. No event is applied once this starts; when it returns the
    /// push channel is gone.
    pub async fn close(&self) {
        let was_open = self.shared.apply(|r| {
            let was_open = !r.is_closed();
            r.close();
            (was_open, was_open)
        });
        self.stop_pump().await;

        if was_open {
            tracing::debug!("Closed subscription for timer {}", self.timer_id);
        }
    }

    async fn stop_pump(&self) {
        let pump = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            pump.abort();
            let _ = pump.await;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }

    /// Shared control-call flow: loading flag, call, then either the local
    /// success update or the failure message.
    async fn run<F>(
        &self,
        failure: &'static str,
        call: F,
        on_success: impl FnOnce(&mut TimerView),
    ) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        self.shared.set_flags(|v| v.is_loading = true);

        match call.await {
            Ok(()) => {
                self.shared.apply_local(|v| {
                    on_success(v);
                    v.is_loading = false;
                    v.error = None;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{} {}: {}", failure, self.timer_id, e);
                self.shared.set_flags(|v| {
                    v.is_loading = false;
                    v.error = Some(failure.to_string());
                });
                Err(e)
            }
        }
    }
}

impl Drop for TimerSubscription {
    fn drop(&mut self) {
        self.shared.apply(|r| {
            r.close();
            ((), false)
        });
        let pump = self
            .pump
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            pump.abort();
        }
    }
}

/// Push connect running in its own task. Dropping it cancels the connect.
struct PendingConnect(JoinHandle<ConnectResult>);

impl PendingConnect {
    fn spawn(push: Arc<dyn PushTransport>, join: JoinRequest) -> Self {
        Self(tokio::spawn(async move { push.connect(&join).await }))
    }

    async fn finish(&mut self) -> ConnectResult {
        match (&mut self.0).await {
            Ok(result) => result,
            Err(e) => Err(TransportError::ConnectionFailed(e.to_string())),
        }
    }

    /// Cancel, closing the connection if it already opened.
    async fn cancel(mut self) {
        self.0.abort();
        if let Ok(mut connection) = self.finish().await {
            connection.close();
        }
    }
}

impl Drop for PendingConnect {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn degrade(shared: &Shared) {
    shared.set_flags(|v| {
        v.sync_state = SyncState::Degraded;
        v.connection_warning = Some(CONNECTION_WARNING.to_string());
    });
}

/// Finish the push connect, then apply events until the channel ends.
/// Owns the connection, so aborting this task drops it.
async fn pump(shared: Arc<Shared>, mut pending: PendingConnect) {
    let timer_id = shared.with(|r| r.timer_id().clone());

    let mut connection = match pending.finish().await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Push channel unavailable for timer {}: {}", timer_id, e);
            degrade(&shared);
            return;
        }
    };
    drop(pending);

    if !shared.set_flags(|v| v.sync_state = SyncState::Joined) {
        connection.close();
        return;
    }
    tracing::debug!("Joined push channel for timer {}", timer_id);

    while let Some(event) = connection.recv().await {
        match event {
            PushEvent::TimerUpdate(payload) => {
                let closed = shared.apply(|r| {
                    let applied = r.apply_push(&payload);
                    (r.is_closed(), applied)
                });
                if closed {
                    break;
                }
            }
            PushEvent::Disconnected(reason) => {
                tracing::warn!("Push channel disconnected: {}", reason);
                degrade(&shared);
                break;
            }
        }
    }
    connection.close();
}
