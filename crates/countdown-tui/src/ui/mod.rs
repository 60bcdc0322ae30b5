mod big_text;
mod helpers;

use countdown_client::{SelectedView, TimerView};
use countdown_core::models::format_clock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use big_text::{BigText, GLYPH_HEIGHT};
use helpers::{centered_rect, status_color, status_label};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    match &app.view {
        SelectedView::Loading => draw_message(f, chunks[1], "Loading...", Color::DarkGray),
        SelectedView::NoSelection(message) => draw_message(f, chunks[1], message, Color::Gray),
        SelectedView::Failed(message) => draw_message(f, chunks[1], message, Color::Red),
        SelectedView::Showing(view) => draw_timer(f, chunks[1], view),
    }

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("[q]", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit  "),
        Span::styled("[?]", Style::default().fg(Color::Yellow)),
        Span::raw(" Help"),
    ]));
    f.render_widget(footer, chunks[2]);

    if app.show_help {
        draw_help(f);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let title = match app.view.timer() {
        Some(view) => format!(" Project {} · {} ", app.project_id, view.snapshot.name),
        None => format!(" Project {} ", app.project_id),
    };
    let sync = match app.view.timer() {
        Some(view) => view.sync_state.as_str(),
        None => "",
    };

    let header = Paragraph::new(Line::from(Span::styled(
        sync,
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Right)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(Style::default().add_modifier(Modifier::BOLD)),
    );
    f.render_widget(header, area);
}

fn draw_message(f: &mut Frame, area: Rect, message: &str, color: Color) {
    let rect = centered_rect(area, area.width.saturating_sub(4), 3);
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, rect);
}

fn draw_timer(f: &mut Frame, area: Rect, view: &TimerView) {
    let color = status_color(view);
    let snapshot = &view.snapshot;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(GLYPH_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let name = Paragraph::new(snapshot.name.as_str())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(name, rows[1]);

    if !snapshot.description.is_empty() {
        let description = Paragraph::new(snapshot.description.as_str())
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(description, rows[2]);
    }

    let clock = format_clock(snapshot.remaining_seconds);
    let clock_area = centered_rect(rows[4], BigText::width(&clock), GLYPH_HEIGHT);
    f.render_widget(
        BigText::new(&clock).style(Style::default().fg(color)),
        clock_area,
    );

    let gauge_area = centered_rect(rows[6], rows[6].width.saturating_sub(8), 1);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color).bg(Color::DarkGray))
        .ratio(snapshot.progress_percent() / 100.0)
        .label(format!("{:.0}%", snapshot.progress_percent()));
    f.render_widget(gauge, gauge_area);

    let status = Paragraph::new(Span::styled(
        status_label(view),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(status, rows[7]);

    if let Some(ref warning) = view.connection_warning {
        let warning = Paragraph::new(warning.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(warning, rows[8]);
    }

    if let Some(ref error) = view.error {
        let error = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        f.render_widget(error, rows[9]);
    }
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(f.area(), 48, 8);
    let lines = vec![
        Line::from("Shows the project's selected timer."),
        Line::from("Switches automatically when the selection changes."),
        Line::from(""),
        Line::from("q / Esc / Ctrl+c   quit"),
        Line::from("? / h              toggle this help"),
    ];
    let help = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Help "));

    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use countdown_core::models::{ProjectId, TimerSnapshot};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_no_selection_screen() {
        let mut app = App::new(ProjectId::from(1));
        app.set_view(SelectedView::NoSelection(
            "No timer selected for this project".to_string(),
        ));
        assert!(render(&app).contains("No timer selected for this project"));
    }

    #[test]
    fn test_timer_screen() {
        let mut snapshot = TimerSnapshot::new("4", "Keynote", 600);
        snapshot.description = "Main stage".to_string();
        let mut view = TimerView::new(snapshot);
        view.connection_warning = Some("Updates may lag".to_string());

        let mut app = App::new(ProjectId::from(1));
        app.set_view(SelectedView::Showing(view));
        let screen = render(&app);

        assert!(screen.contains("Keynote"));
        assert!(screen.contains("Main stage"));
        assert!(screen.contains("Ready"));
        assert!(screen.contains("Updates may lag"));
        assert!(screen.contains("█"));
    }

    #[test]
    fn test_help_overlay() {
        let mut app = App::new(ProjectId::from(1));
        app.show_help = true;
        assert!(render(&app).contains("toggle this help"));
    }
}
