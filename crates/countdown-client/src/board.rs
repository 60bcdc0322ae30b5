//! Project board: the owning list of a project's timers.
//!
//! Per-timer subscriptions only flip their own `is_selected` flag. The board
//! holds the one selection pointer, so at most one timer is marked.

use countdown_core::models::{Project, ProjectId, TimerDraft, TimerId, TimerSnapshot};
use std::sync::Arc;

use crate::api::ControlApi;
use crate::{ClientError, Result};

pub struct ProjectBoard {
    api: Arc<dyn ControlApi>,
    project: Project,
}

impl ProjectBoard {
    pub async fn load(api: Arc<dyn ControlApi>, project_id: &ProjectId) -> Result<Self> {
        let project = api.get_project(project_id).await?;
        tracing::debug!(
            "Loaded project {} with {} timers",
            project.id,
            project.timers.len()
        );
        Ok(Self { api, project })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project.id
    }

    pub fn timers(&self) -> &[TimerSnapshot] {
        &self.project.timers
    }

    pub fn timer(&self, timer_id: &TimerId) -> Option<&TimerSnapshot> {
        self.project.timer(timer_id)
    }

    pub fn selected_timer_id(&self) -> Option<&TimerId> {
        self.project.selection.selected_timer_id.as_ref()
    }

    pub fn is_selected(&self, timer_id: &TimerId) -> bool {
        self.project.selection.is_selected(timer_id)
    }

    /// Select `timer_id`, replacing any previous selection.
    pub async fn select(&mut self, timer_id: &TimerId) -> Result<()> {
        if self.timer(timer_id).is_none() {
            return Err(ClientError::NotFound(Some(format!(
                "Timer {} is not on this board",
                timer_id
            ))));
        }

        self.api.select_timer(&self.project.id, timer_id).await?;
        self.project.selection.select(timer_id.clone());
        Ok(())
    }

    pub async fn deselect(&mut self) -> Result<()> {
        self.api.deselect_timer(&self.project.id).await?;
        self.project.selection.clear();
        Ok(())
    }

    /// Create a timer from raw form input. Invalid input makes no request.
    pub async fn create_timer(
        &mut self,
        name: &str,
        description: &str,
        duration_input: &str,
    ) -> Result<TimerSnapshot> {
        let draft = TimerDraft::from_input(name, description, duration_input)
            .map_err(ClientError::InvalidInput)?;

        let created = self.api.create_timer(&self.project.id, &draft).await?;
        tracing::info!("Created timer {} ({})", created.id, created.name);
        self.project.upsert_timer(created.clone());
        Ok(created)
    }

    /// Fold in a timer state reported by a subscription.
    pub fn timer_updated(&mut self, snapshot: TimerSnapshot) {
        self.project.upsert_timer(snapshot);
    }

    /// Drop a deleted timer, and the selection with it if it pointed there.
    pub fn timer_deleted(&mut self, timer_id: &TimerId) {
        self.project.remove_timer(timer_id);
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.project = self.api.get_project(&self.project.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiCall, MockControlApi};

    async fn board(api: &MockControlApi) -> ProjectBoard {
        ProjectBoard::load(Arc::new(api.clone()), &ProjectId::from(1))
            .await
            .unwrap()
    }

    fn api() -> MockControlApi {
        let api = MockControlApi::new();
        api.insert_timer(TimerSnapshot::new("1", "Keynote", 3600));
        api.insert_timer(TimerSnapshot::new("2", "Q&A", 600));
        api
    }

    #[tokio::test]
    async fn test_selection_is_exclusive() {
        let api = api();
        let mut board = board(&api).await;

        board.select(&TimerId::from(1)).await.unwrap();
        board.select(&TimerId::from(2)).await.unwrap();

        assert!(!board.is_selected(&TimerId::from(1)));
        assert!(board.is_selected(&TimerId::from(2)));
        let marked = board
            .timers()
            .iter()
            .filter(|t| board.is_selected(&t.id))
            .count();
        assert_eq!(marked, 1);

        board.deselect().await.unwrap();
        assert_eq!(board.selected_timer_id(), None);
    }

    #[tokio::test]
    async fn test_create_with_invalid_duration_makes_no_call() {
        let api = api();
        let mut board = board(&api).await;
        api.clear_calls();

        let err = board.create_timer("Break", "", "0s").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(ref m) if m == "Duration must be greater than 0"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_appends_timer() {
        let api = api();
        let mut board = board(&api).await;

        let created = board.create_timer("Break", "Coffee", "15m").await.unwrap();
        assert_eq!(created.duration, 900);
        assert_eq!(board.timers().len(), 3);
        assert!(matches!(api.calls().last(), Some(ApiCall::CreateTimer(_))));
    }

    #[tokio::test]
    async fn test_timer_deleted_clears_selection() {
        let api = api();
        let mut board = board(&api).await;
        board.select(&TimerId::from(2)).await.unwrap();

        board.timer_deleted(&TimerId::from(2));
        assert_eq!(board.timers().len(), 1);
        assert_eq!(board.selected_timer_id(), None);
    }

    #[tokio::test]
    async fn test_timer_updated_replaces_entry() {
        let api = api();
        let mut board = board(&api).await;

        let mut snapshot = TimerSnapshot::new("2", "Q&A", 600);
        snapshot.paused = false;
        snapshot.remaining_seconds = 540;
        board.timer_updated(snapshot);

        assert_eq!(board.timers().len(), 2);
        assert!(board.timer(&TimerId::from(2)).unwrap().is_running());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_remote_changes() {
        let api = api();
        let mut board = board(&api).await;

        api.set_selected(Some(TimerId::from(1)));
        api.set_remaining(&TimerId::from(1), 10);
        board.refresh().await.unwrap();

        assert!(board.is_selected(&TimerId::from(1)));
        assert_eq!(board.timer(&TimerId::from(1)).unwrap().remaining_seconds, 10);
    }
}
