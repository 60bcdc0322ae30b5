//! Follows whichever timer is currently selected in a project.
//!
//! Push updates are scoped to one joined timer, so a change of selection
//! can only be discovered by polling the project's selection pointer. Each
//! poll either refreshes the current subscription or replaces it; the old
//! subscription is always fully closed before the new one is mounted.

use countdown_core::models::{PollConfig, ProjectId, TimerSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::reconcile::PollOutcome;
use super::subscription::{MountOptions, TimerSubscription};
use super::view::TimerView;
use crate::api::ControlApi;
use crate::push::PushTransport;

pub const NO_SELECTION_MESSAGE: &str = "No timer selected for this project";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load selected timer data";

#[derive(Debug, Clone, PartialEq)]
pub enum SelectedView {
    /// Before the first poll has answered.
    Loading,
    NoSelection(String),
    /// Nothing to show and the last poll failed.
    Failed(String),
    Showing(TimerView),
}

impl SelectedView {
    pub fn timer(&self) -> Option<&TimerView> {
        match self {
            SelectedView::Showing(view) => Some(view),
            _ => None,
        }
    }
}

pub struct SelectedTimerWatcher {
    project_id: ProjectId,
    api: Arc<dyn ControlApi>,
    push: Option<Arc<dyn PushTransport>>,
    interval: Duration,
    view_tx: watch::Sender<SelectedView>,
    current: Option<TimerSubscription>,
    current_rx: Option<watch::Receiver<TimerView>>,
}

/// Handle to a running watcher. Dropping it aborts the watcher.
pub struct SelectedTimerHandle {
    view_rx: watch::Receiver<SelectedView>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SelectedTimerWatcher {
    /// Start polling. The first poll runs immediately.
    pub fn spawn(
        project_id: ProjectId,
        api: Arc<dyn ControlApi>,
        push: Option<Arc<dyn PushTransport>>,
        config: &PollConfig,
    ) -> SelectedTimerHandle {
        let (view_tx, view_rx) = watch::channel(SelectedView::Loading);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let watcher = Self {
            project_id,
            api,
            push,
            interval: config.selected_interval(),
            view_tx,
            current: None,
            current_rx: None,
        };
        let task = tokio::spawn(watcher.run(shutdown_rx));

        SelectedTimerHandle {
            view_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        tracing::info!(
            "Watching selected timer of project {} every {:?}",
            self.project_id,
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.poll().await,
                changed = next_view(&mut self.current_rx) => match changed {
                    Some(view) => self.publish(SelectedView::Showing(view)),
                    None => self.current_rx = None,
                },
            }
        }

        self.teardown().await;
        tracing::debug!("Stopped watching project {}", self.project_id);
    }

    async fn poll(&mut self) {
        let ticket = self.current.as_ref().map(TimerSubscription::begin_poll);

        match self.api.get_selected_timer(&self.project_id).await {
            Ok(payload) => {
                let outcome = match (&self.current, ticket) {
                    (Some(current), Some(ticket)) => current.apply_poll(ticket, &payload),
                    _ => PollOutcome::Switched,
                };
                if matches!(outcome, PollOutcome::Switched | PollOutcome::Closed) {
                    self.switch_to(TimerSnapshot::from_payload(payload)).await;
                }
            }
            Err(e) if e.is_not_found() => {
                let message = e
                    .not_found_message()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(NO_SELECTION_MESSAGE)
                    .to_string();
                if self.current.is_some() {
                    tracing::info!("Project {} has no selected timer", self.project_id);
                }
                self.teardown().await;
                self.publish(SelectedView::NoSelection(message));
            }
            Err(e) => {
                tracing::warn!("Failed to poll selected timer: {}", e);
                match &self.current {
                    Some(current) => current.set_error(LOAD_FAILED_MESSAGE),
                    None => self.publish(SelectedView::Failed(LOAD_FAILED_MESSAGE.to_string())),
                }
            }
        }
    }

    /// Teardown of the old subscription completes before setup of the new.
    /// The new timer is shown straight away; its push channel joins later.
    async fn switch_to(&mut self, snapshot: TimerSnapshot) {
        if let Some(previous) = &self.current {
            tracing::info!(
                "Selected timer changed from {} to {}",
                previous.timer_id(),
                snapshot.id
            );
        }
        self.teardown().await;

        let subscription = TimerSubscription::mount_with_snapshot(
            self.project_id.clone(),
            snapshot,
            self.api.clone(),
            self.push.clone(),
            MountOptions { selected: true },
        );

        let mut rx = subscription.subscribe();
        let view = rx.borrow_and_update().clone();
        self.current = Some(subscription);
        self.current_rx = Some(rx);
        self.publish(SelectedView::Showing(view));
    }

    async fn teardown(&mut self) {
        self.current_rx = None;
        if let Some(subscription) = self.current.take() {
            subscription.close().await;
        }
    }

    fn publish(&self, view: SelectedView) {
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

/// Next view from the current subscription. Pends forever without one.
async fn next_view(rx: &mut Option<watch::Receiver<TimerView>>) -> Option<TimerView> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

impl SelectedTimerHandle {
    pub fn subscribe(&self) -> watch::Receiver<SelectedView> {
        self.view_rx.clone()
    }

    pub fn current(&self) -> SelectedView {
        self.view_rx.borrow().clone()
    }

    /// Stop polling and close the current subscription.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SelectedTimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
