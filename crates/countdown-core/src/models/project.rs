use serde::{Deserialize, Serialize};

use super::{ProjectId, TimerId, TimerSnapshot};
use crate::duration::validate_duration_input;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timers: Vec<TimerSnapshot>,
    #[serde(flatten)]
    pub selection: ProjectSelection,
}

/// The single project-wide "selected timer" pointer shown by the public
/// display. The server enforces exclusivity; this is the client's copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSelection {
    #[serde(default)]
    pub selected_timer_id: Option<TimerId>,
}

impl ProjectSelection {
    pub fn is_selected(&self, timer_id: &TimerId) -> bool {
        self.selected_timer_id.as_ref() == Some(timer_id)
    }

    /// Point at `timer_id`, replacing any previous selection.
    pub fn select(&mut self, timer_id: TimerId) {
        self.selected_timer_id = Some(timer_id);
    }

    pub fn clear(&mut self) {
        self.selected_timer_id = None;
    }
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            timers: Vec::new(),
            selection: ProjectSelection::default(),
        }
    }

    pub fn timer(&self, timer_id: &TimerId) -> Option<&TimerSnapshot> {
        self.timers.iter().find(|t| &t.id == timer_id)
    }

    pub fn selected_timer(&self) -> Option<&TimerSnapshot> {
        self.selection
            .selected_timer_id
            .as_ref()
            .and_then(|id| self.timer(id))
    }

    /// Insert or replace a timer by id.
    pub fn upsert_timer(&mut self, timer: TimerSnapshot) {
        match self.timers.iter_mut().find(|t| t.id == timer.id) {
            Some(existing) => *existing = timer,
            None => self.timers.push(timer),
        }
    }

    /// Remove a timer; a selection pointing at it is cleared as well.
    pub fn remove_timer(&mut self, timer_id: &TimerId) -> Option<TimerSnapshot> {
        let index = self.timers.iter().position(|t| &t.id == timer_id)?;
        if self.selection.is_selected(timer_id) {
            self.selection.clear();
        }
        Some(self.timers.remove(index))
    }
}

/// Body of a timer create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDraft {
    pub name: String,
    pub description: String,
    pub duration: u64,
}

impl TimerDraft {
    /// Build a draft from raw form input. Fails with an inline message when
    /// the name is blank or the duration does not parse.
    pub fn from_input(
        name: &str,
        description: &str,
        duration_input: &str,
    ) -> std::result::Result<Self, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Timer name is required".to_string());
        }

        let duration = validate_duration_input(duration_input)?;

        Ok(Self {
            name: name.to_string(),
            description: description.trim().to_string(),
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_project_with_selection() {
        let json = r#"{
            "id": 1,
            "name": "Conference",
            "description": "Main hall",
            "selected_timer_id": 2,
            "timers": [
                {"id": 1, "name": "Keynote", "duration": 3600, "remaining_seconds": 3600},
                {"id": 2, "name": "Q&A", "duration": 600, "remaining_seconds": 300}
            ]
        }"#;

        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.timers.len(), 2);
        assert!(project.selection.is_selected(&TimerId::from(2)));
        assert_eq!(project.selected_timer().unwrap().name, "Q&A");
    }

    #[test]
    fn test_deserialize_project_without_selection() {
        let json = r#"{"id": 1, "name": "Conference", "timers": []}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.selection.selected_timer_id.is_none());
        assert!(project.selected_timer().is_none());
    }

    #[test]
    fn test_select_replaces_previous() {
        let mut selection = ProjectSelection::default();
        selection.select(TimerId::from(1));
        selection.select(TimerId::from(2));
        assert!(!selection.is_selected(&TimerId::from(1)));
        assert!(selection.is_selected(&TimerId::from(2)));

        selection.clear();
        assert!(selection.selected_timer_id.is_none());
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut project = Project::new("1", "Conference");
        project.upsert_timer(TimerSnapshot::new("1", "Keynote", 60));
        project.upsert_timer(TimerSnapshot::new("1", "Opening", 90));
        assert_eq!(project.timers.len(), 1);
        assert_eq!(project.timers[0].name, "Opening");

        project.selection.select(TimerId::from(1));
        let removed = project.remove_timer(&TimerId::from(1)).unwrap();
        assert_eq!(removed.name, "Opening");
        assert!(project.selection.selected_timer_id.is_none());
        assert!(project.remove_timer(&TimerId::from(1)).is_none());
    }

    #[test]
    fn test_draft_from_input() {
        let draft = TimerDraft::from_input(" Keynote ", "", "1h").unwrap();
        assert_eq!(draft.name, "Keynote");
        assert_eq!(draft.duration, 3600);

        assert_eq!(
            TimerDraft::from_input("  ", "", "1h"),
            Err("Timer name is required".to_string())
        );
        assert_eq!(
            TimerDraft::from_input("Keynote", "", ""),
            Err("Duration is required".to_string())
        );
        assert!(TimerDraft::from_input("Keynote", "", "0s").is_err());
    }
}
