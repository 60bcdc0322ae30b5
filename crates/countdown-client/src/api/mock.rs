//! In-memory control API for testing.
//!
//! Behaves like a single-project server: commands mutate the stored timers,
//! every call is recorded, and individual operations can be made to fail.

use async_trait::async_trait;
use countdown_core::models::{
    Project, ProjectId, TimerDraft, TimerId, TimerPayload, TimerSnapshot,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::ControlApi;
use crate::{ClientError, Result};

const NO_SELECTION: &str = "No timer selected for this project";

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    GetProject(ProjectId),
    GetTimer(TimerId),
    GetSelectedTimer(ProjectId),
    CreateTimer(TimerDraft),
    UpdateTimer(TimerId, TimerDraft),
    DeleteTimer(TimerId),
    Start(TimerId),
    Pause(TimerId),
    Reset(TimerId),
    Select(TimerId),
    Deselect(ProjectId),
}

/// Operation selector for forced failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOp {
    GetProject,
    GetTimer,
    GetSelectedTimer,
    CreateTimer,
    UpdateTimer,
    DeleteTimer,
    Start,
    Pause,
    Reset,
    Select,
    Deselect,
}

#[derive(Debug, Clone, Default)]
pub struct MockControlApi {
    inner: Arc<Mutex<MockApiInner>>,
}

#[derive(Debug)]
struct MockApiInner {
    project: Project,
    calls: Vec<ApiCall>,
    failures: VecDeque<(ApiOp, u16)>,
    next_id: u64,
    partial_responses: bool,
}

impl Default for MockApiInner {
    fn default() -> Self {
        Self {
            project: Project::new("1", "Mock Project"),
            calls: Vec::new(),
            failures: VecDeque::new(),
            next_id: 1,
            partial_responses: false,
        }
    }
}

impl MockControlApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the given project state.
    pub fn with_project(project: Project) -> Self {
        let next_id = project
            .timers
            .iter()
            .filter_map(|t| numeric_id(&t.id))
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            inner: Arc::new(Mutex::new(MockApiInner {
                project,
                next_id,
                ..MockApiInner::default()
            })),
        }
    }

    pub fn insert_timer(&self, timer: TimerSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(id) = numeric_id(&timer.id) {
            inner.next_id = inner.next_id.max(id + 1);
        }
        inner.project.upsert_timer(timer);
    }

    /// Answer timer reads and edits with only `id`, `name`, `duration` and
    /// `remaining_seconds`, like the reference server does.
    pub fn set_partial_responses(&self, partial: bool) {
        self.inner.lock().unwrap().partial_responses = partial;
    }

    /// Simulate server-side countdown progress.
    pub fn set_remaining(&self, timer_id: &TimerId, remaining_seconds: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(timer) = inner.project.timers.iter_mut().find(|t| &t.id == timer_id) {
            timer.remaining_seconds = remaining_seconds;
        }
    }

    /// Change the selection pointer without recording a call, as another
    /// client would.
    pub fn set_selected(&self, timer_id: Option<TimerId>) {
        let mut inner = self.inner.lock().unwrap();
        inner.project.selection.selected_timer_id = timer_id;
    }

    pub fn project(&self) -> Project {
        self.inner.lock().unwrap().project.clone()
    }

    pub fn timer(&self, timer_id: &TimerId) -> Option<TimerSnapshot> {
        self.inner.lock().unwrap().project.timer(timer_id).cloned()
    }

    /// Fail the next call of `op` with the given HTTP status.
    pub fn fail_next(&self, op: ApiOp, status: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.push_back((op, status));
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Record the call, then apply `f` unless a failure is queued for `op`.
    fn handle<T>(
        &self,
        op: ApiOp,
        call: ApiCall,
        f: impl FnOnce(&mut MockApiInner) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);

        if let Some(index) = inner.failures.iter().position(|(failing, _)| *failing == op) {
            let (_, status) = inner.failures.remove(index).unwrap_or((op, 500));
            return Err(if status == 404 {
                ClientError::NotFound(None)
            } else {
                ClientError::Status {
                    status,
                    message: "mock failure".to_string(),
                }
            });
        }

        f(&mut inner)
    }
}

impl MockApiInner {
    fn timer_mut(&mut self, timer_id: &TimerId) -> Result<&mut TimerSnapshot> {
        self.project
            .timers
            .iter_mut()
            .find(|t| &t.id == timer_id)
            .ok_or_else(|| timer_not_found(timer_id))
    }

    fn respond(&self, timer: TimerSnapshot) -> TimerPayload {
        let mut payload = TimerPayload::from(timer);
        if self.partial_responses {
            payload.description = None;
            payload.paused = None;
        }
        payload
    }
}

fn numeric_id(id: &TimerId) -> Option<u64> {
    id.as_str().parse().ok()
}

fn timer_not_found(timer_id: &TimerId) -> ClientError {
    ClientError::NotFound(Some(format!("Timer {} not found", timer_id)))
}

#[async_trait]
impl ControlApi for MockControlApi {
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project> {
        self.handle(ApiOp::GetProject, ApiCall::GetProject(project_id.clone()), |inner| {
            Ok(inner.project.clone())
        })
    }

    async fn get_timer(
        &self,
        _project_id: &ProjectId,
        timer_id: &TimerId,
    ) -> Result<TimerPayload> {
        self.handle(ApiOp::GetTimer, ApiCall::GetTimer(timer_id.clone()), |inner| {
            let timer = inner.timer_mut(timer_id)?.clone();
            Ok(inner.respond(timer))
        })
    }

    async fn get_selected_timer(&self, project_id: &ProjectId) -> Result<TimerPayload> {
        self.handle(
            ApiOp::GetSelectedTimer,
            ApiCall::GetSelectedTimer(project_id.clone()),
            |inner| {
                let timer = inner
                    .project
                    .selected_timer()
                    .cloned()
                    .ok_or_else(|| ClientError::NotFound(Some(NO_SELECTION.to_string())))?;
                Ok(inner.respond(timer))
            },
        )
    }

    async fn create_timer(
        &self,
        _project_id: &ProjectId,
        draft: &TimerDraft,
    ) -> Result<TimerSnapshot> {
        self.handle(ApiOp::CreateTimer, ApiCall::CreateTimer(draft.clone()), |inner| {
            let id = TimerId::from(inner.next_id);
            inner.next_id += 1;

            let mut timer = TimerSnapshot::new(id, draft.name.clone(), draft.duration);
            timer.description = draft.description.clone();
            inner.project.upsert_timer(timer.clone());
            Ok(timer)
        })
    }

    async fn update_timer(
        &self,
        _project_id: &ProjectId,
        timer_id: &TimerId,
        draft: &TimerDraft,
    ) -> Result<TimerPayload> {
        self.handle(
            ApiOp::UpdateTimer,
            ApiCall::UpdateTimer(timer_id.clone(), draft.clone()),
            |inner| {
                let timer = inner.timer_mut(timer_id)?;
                timer.name = draft.name.clone();
                timer.description = draft.description.clone();
                timer.duration = draft.duration;
                timer.remaining_seconds = draft.duration;
                let timer = timer.clone();
                Ok(inner.respond(timer))
            },
        )
    }

    async fn delete_timer(&self, _project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.handle(ApiOp::DeleteTimer, ApiCall::DeleteTimer(timer_id.clone()), |inner| {
            inner
                .project
                .remove_timer(timer_id)
                .map(|_| ())
                .ok_or_else(|| timer_not_found(timer_id))
        })
    }

    async fn start_timer(&self, _project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.handle(ApiOp::Start, ApiCall::Start(timer_id.clone()), |inner| {
            inner.timer_mut(timer_id)?.paused = false;
            Ok(())
        })
    }

    async fn pause_timer(&self, _project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.handle(ApiOp::Pause, ApiCall::Pause(timer_id.clone()), |inner| {
            inner.timer_mut(timer_id)?.paused = true;
            Ok(())
        })
    }

    async fn reset_timer(&self, _project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.handle(ApiOp::Reset, ApiCall::Reset(timer_id.clone()), |inner| {
            let timer = inner.timer_mut(timer_id)?;
            timer.paused = true;
            timer.remaining_seconds = timer.duration;
            Ok(())
        })
    }

    async fn select_timer(&self, _project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.handle(ApiOp::Select, ApiCall::Select(timer_id.clone()), |inner| {
            inner.timer_mut(timer_id)?;
            inner.project.selection.select(timer_id.clone());
            Ok(())
        })
    }

    async fn deselect_timer(&self, project_id: &ProjectId) -> Result<()> {
        self.handle(ApiOp::Deselect, ApiCall::Deselect(project_id.clone()), |inner| {
            inner.project.selection.clear();
            Ok(())
        })
    }
}
