use anyhow::{bail, Result};
use countdown_client::{
    ControlApi, HttpControlApi, MountOptions, ProjectBoard, PushTransport, SelectedTimerWatcher,
    SelectedView, SocketIoTransport, TimerSubscription, TimerView,
};
use countdown_core::duration::parse_duration;
use countdown_core::models::{
    format_clock, Config, ProjectId, TimerDraft, TimerId, TimerSnapshot,
};
use countdown_core::storage::ConfigStorage;
use std::sync::Arc;

use crate::{Command, TimerForm};

struct Clients {
    api: Arc<dyn ControlApi>,
    push: Option<Arc<dyn PushTransport>>,
}

impl Clients {
    fn from_config(config: &Config) -> Result<Self> {
        let api: Arc<dyn ControlApi> = Arc::new(HttpControlApi::from_config(&config.api)?);
        let push: Option<Arc<dyn PushTransport>> = if config.push.enabled {
            Some(Arc::new(SocketIoTransport::from_config(&config.push)))
        } else {
            None
        };
        Ok(Self { api, push })
    }

    /// One-shot commands do not need live updates.
    async fn subscription(&self, project: &str, timer: &str) -> Result<TimerSubscription> {
        let subscription = TimerSubscription::mount(
            ProjectId::from(project),
            TimerId::from(timer),
            self.api.clone(),
            None,
            MountOptions::default(),
        )
        .await?;
        Ok(subscription)
    }
}

pub async fn run(command: Command, config: Config, storage: &ConfigStorage) -> Result<()> {
    let clients = Clients::from_config(&config)?;

    match command {
        Command::Parse { input } => parse(&input)?,
        Command::Config => {
            println!("# {}", storage.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Project { project } => {
            let board = ProjectBoard::load(clients.api.clone(), &ProjectId::from(project)).await?;
            print_board(&board);
        }
        Command::Create { project, form } => {
            let TimerForm {
                name,
                duration,
                description,
            } = form;
            let mut board =
                ProjectBoard::load(clients.api.clone(), &ProjectId::from(project)).await?;
            let created = board.create_timer(&name, &description, &duration).await?;
            println!("Created timer {}: {}", created.id, timer_line(&created, false));
        }
        Command::Update {
            project,
            timer,
            form,
        } => {
            check_form(&form)?;
            let subscription = clients.subscription(&project, &timer).await?;
            let result = subscription
                .update(&form.name, &form.description, &form.duration)
                .await;
            let view = subscription.view();
            subscription.close().await;

            result?;
            println!("{}", view_line(&view));
        }
        Command::Delete { project, timer } => {
            let subscription = clients.subscription(&project, &timer).await?;
            subscription.delete().await?;
            println!("Deleted timer {}", timer);
        }
        Command::Start { project, timer } => {
            control(&clients, &project, &timer, Control::Start).await?;
        }
        Command::Pause { project, timer } => {
            control(&clients, &project, &timer, Control::Pause).await?;
        }
        Command::Reset { project, timer } => {
            control(&clients, &project, &timer, Control::Reset).await?;
        }
        Command::Select { project, timer } => {
            let mut board =
                ProjectBoard::load(clients.api.clone(), &ProjectId::from(project)).await?;
            board.select(&TimerId::from(timer)).await?;
            print_board(&board);
        }
        Command::Deselect { project } => {
            let mut board =
                ProjectBoard::load(clients.api.clone(), &ProjectId::from(project)).await?;
            board.deselect().await?;
            println!("No timer selected");
        }
        Command::Watch { project, timer } => watch(&clients, &project, &timer).await?,
        Command::WatchSelected { project } => watch_selected(&clients, &config, &project).await?,
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Start,
    Pause,
    Reset,
}

async fn control(clients: &Clients, project: &str, timer: &str, control: Control) -> Result<()> {
    let subscription = clients.subscription(project, timer).await?;
    let result = match control {
        Control::Start => subscription.start().await,
        Control::Pause => subscription.pause().await,
        Control::Reset => subscription.reset().await,
    };
    let view = subscription.view();
    subscription.close().await;

    result?;
    println!("{}", view_line(&view));
    Ok(())
}

fn parse(input: &str) -> Result<()> {
    println!("{}", parse_line(input)?);
    Ok(())
}

fn parse_line(input: &str) -> Result<String> {
    let parsed = parse_duration(input);
    if !parsed.is_valid {
        bail!(parsed.hint());
    }
    Ok(parsed.hint())
}

/// Reject a bad form before anything is fetched.
fn check_form(form: &TimerForm) -> Result<()> {
    TimerDraft::from_input(&form.name, &form.description, &form.duration)
        .map(|_| ())
        .map_err(anyhow::Error::msg)
}

async fn watch(clients: &Clients, project: &str, timer: &str) -> Result<()> {
    let subscription = TimerSubscription::mount(
        ProjectId::from(project),
        TimerId::from(timer),
        clients.api.clone(),
        clients.push.clone(),
        MountOptions::default(),
    )
    .await?;

    let mut rx = subscription.subscribe();
    println!("{}", view_line(&rx.borrow_and_update()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = rx.borrow_and_update().clone();
                println!("{}", view_line(&view));
                if view.deleted {
                    break;
                }
            }
        }
    }

    subscription.close().await;
    Ok(())
}

async fn watch_selected(clients: &Clients, config: &Config, project: &str) -> Result<()> {
    let handle = SelectedTimerWatcher::spawn(
        ProjectId::from(project),
        clients.api.clone(),
        clients.push.clone(),
        &config.poll,
    );
    let mut rx = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = rx.borrow_and_update().clone();
                println!("{}", selected_line(&view));
            }
        }
    }

    handle.close().await;
    Ok(())
}

fn print_board(board: &ProjectBoard) {
    let project = board.project();
    println!("{} ({})", project.name, project.id);
    if board.timers().is_empty() {
        println!("  no timers");
    }
    for timer in board.timers() {
        println!("  {}", timer_line(timer, board.is_selected(&timer.id)));
    }
}

fn timer_line(timer: &TimerSnapshot, selected: bool) -> String {
    format!(
        "{} {:>4}  {:<24} {}  {:>5.1}%  {}",
        if selected { '*' } else { ' ' },
        timer.id,
        timer.name,
        format_clock(timer.remaining_seconds),
        timer.progress_percent(),
        timer.status().as_str()
    )
}

fn view_line(view: &TimerView) -> String {
    let mut line = timer_line(&view.snapshot, view.is_selected);
    if view.deleted {
        line.push_str("  [deleted]");
    }
    if let Some(ref error) = view.error {
        line.push_str(&format!("  error: {}", error));
    }
    if let Some(ref warning) = view.connection_warning {
        line.push_str(&format!("  ({})", warning));
    }
    line
}

fn selected_line(view: &SelectedView) -> String {
    match view {
        SelectedView::Loading => "Loading...".to_string(),
        SelectedView::NoSelection(message) => message.clone(),
        SelectedView::Failed(message) => format!("error: {}", message),
        SelectedView::Showing(timer) => view_line(timer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_line() {
        let mut timer = TimerSnapshot::new("3", "Keynote", 3600);
        timer.remaining_seconds = 900;
        let line = timer_line(&timer, true);

        assert!(line.starts_with("*    3  Keynote"));
        assert!(line.contains("00:15:00"));
        assert!(line.contains("75.0%"));
        assert!(line.ends_with("Paused"));
    }

    #[test]
    fn test_view_line_shows_warning() {
        let mut view = TimerView::new(TimerSnapshot::new("3", "Keynote", 60));
        view.connection_warning = Some("offline".to_string());
        assert!(view_line(&view).ends_with("(offline)"));
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("1h30m").unwrap(), "= 1h30m (5400 seconds)");
        assert_eq!(
            parse_line("0s").unwrap_err().to_string(),
            "Duration must be greater than 0"
        );
    }

    #[test]
    fn test_check_form() {
        let form = |name: &str, duration: &str| TimerForm {
            name: name.to_string(),
            duration: duration.to_string(),
            description: String::new(),
        };

        assert!(check_form(&form("Keynote", "45m")).is_ok());
        assert_eq!(
            check_form(&form(" ", "45m")).unwrap_err().to_string(),
            "Timer name is required"
        );
        assert!(check_form(&form("Keynote", "soon")).is_err());
    }

    #[test]
    fn test_selected_line() {
        assert_eq!(
            selected_line(&SelectedView::NoSelection("No timer selected".to_string())),
            "No timer selected"
        );
        assert_eq!(
            selected_line(&SelectedView::Failed("boom".to_string())),
            "error: boom"
        );
    }
}
