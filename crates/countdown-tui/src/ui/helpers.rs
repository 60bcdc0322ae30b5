use countdown_client::TimerView;
use countdown_core::models::{RunState, TimerStatus};
use ratatui::{layout::Rect, style::Color};

pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

pub fn status_color(view: &TimerView) -> Color {
    match view.snapshot.status() {
        TimerStatus::Finished => Color::Red,
        TimerStatus::Running => Color::Green,
        TimerStatus::Paused => Color::Yellow,
    }
}

pub fn status_label(view: &TimerView) -> &'static str {
    if view.snapshot.is_ended() {
        return "Finished";
    }
    match view.run_state {
        RunState::Running => "Running",
        RunState::Paused => "Paused",
        RunState::Idle => "Ready",
    }
}
