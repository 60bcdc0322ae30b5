//! REST control API
//!
//! The server of record owns every timer. Everything here is a thin command
//! or query against it; reconciliation lives in [`crate::sync`].

mod http;
mod mock;

pub use http::HttpControlApi;
pub use mock::{ApiCall, ApiOp, MockControlApi};

use async_trait::async_trait;
use countdown_core::models::{
    Project, ProjectId, TimerDraft, TimerId, TimerPayload, TimerSnapshot,
};

use crate::Result;

#[async_trait]
pub trait ControlApi: Send + Sync {
    /// `GET /projects/{id}`: timers plus the selection pointer.
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project>;

    /// Timer reads may omit fields; callers merge them into what they know.
    async fn get_timer(&self, project_id: &ProjectId, timer_id: &TimerId)
        -> Result<TimerPayload>;

    /// `GET /projects/{id}/selected-timer`. A project without a selection
    /// answers with [`crate::ClientError::NotFound`].
    async fn get_selected_timer(&self, project_id: &ProjectId) -> Result<TimerPayload>;

    async fn create_timer(&self, project_id: &ProjectId, draft: &TimerDraft)
        -> Result<TimerSnapshot>;

    async fn update_timer(
        &self,
        project_id: &ProjectId,
        timer_id: &TimerId,
        draft: &TimerDraft,
    ) -> Result<TimerPayload>;

    async fn delete_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()>;

    async fn start_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()>;

    async fn pause_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()>;

    async fn reset_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()>;

    /// Point the project's single selection at `timer_id`. The server drops
    /// any previous selection.
    async fn select_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()>;

    async fn deselect_timer(&self, project_id: &ProjectId) -> Result<()>;
}
