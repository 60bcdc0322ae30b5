use countdown_client::SelectedView;
use countdown_core::models::ProjectId;
use crossterm::event::{KeyCode, KeyModifiers};

/// State behind the selected-timer display.
pub struct App {
    pub project_id: ProjectId,
    pub view: SelectedView,
    pub show_help: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            view: SelectedView::Loading,
            show_help: false,
            should_quit: false,
        }
    }

    pub fn set_view(&mut self, view: SelectedView) {
        if let (SelectedView::Showing(old), SelectedView::Showing(new)) = (&self.view, &view) {
            if old.snapshot.id != new.snapshot.id {
                tracing::info!("Display switched to timer {}", new.snapshot.id);
            }
        }
        self.view = view;
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.show_help = !self.show_help,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        for (code, modifiers) in [
            (KeyCode::Char('q'), KeyModifiers::NONE),
            (KeyCode::Esc, KeyModifiers::NONE),
            (KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut app = App::new(ProjectId::from(1));
            app.handle_key(code, modifiers);
            assert!(app.should_quit, "{:?} should quit", code);
        }
    }

    #[test]
    fn test_plain_c_does_not_quit() {
        let mut app = App::new(ProjectId::from(1));
        app.handle_key(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_help_toggles() {
        let mut app = App::new(ProjectId::from(1));
        app.handle_key(KeyCode::Char('?'), KeyModifiers::NONE);
        assert!(app.show_help);
        app.handle_key(KeyCode::Char('?'), KeyModifiers::NONE);
        assert!(!app.show_help);
    }
}
