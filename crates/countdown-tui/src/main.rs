mod app;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use countdown_client::{
    ControlApi, HttpControlApi, PushTransport, SelectedTimerWatcher, SocketIoTransport,
};
use countdown_core::models::{ConfigOverrides, ProjectId};
use countdown_core::storage::{init_config_dir, ConfigStorage};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

fn setup_logging(level: &str) -> Result<()> {
    let mut log_path = std::env::temp_dir();
    log_path.push("countdown-display.log");

    let log_file = std::fs::File::create(log_path)?;
    let filter = format!(
        "countdown_tui={level},countdown_client={level},countdown_core={level}",
        level = level
    );
    let subscriber = tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(filter)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
        let _ = execute!(std::io::stdout(), crossterm::cursor::Show);

        tracing::error!(?panic_info, "Display panicked");

        eprintln!("A fatal error occurred: {}", panic_info);

        original_hook(panic_info);
    }));
}

#[derive(Parser, Debug)]
#[command(name = "countdown-display")]
#[command(about = "Full-screen display of a project's selected timer", long_about = None)]
struct Args {
    /// Project whose selected timer is shown
    #[arg(short, long)]
    project: String,

    /// Directory holding config.json
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    api_url: Option<String>,

    #[arg(long)]
    push_url: Option<String>,

    /// Rely on polling only
    #[arg(long)]
    no_push: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = match args.config {
        Some(dir) => dir,
        None => init_config_dir()?,
    };
    let storage = ConfigStorage::new(config_dir);
    let overrides = ConfigOverrides {
        api_url: args.api_url,
        push_url: args.push_url,
        disable_push: args.no_push,
        log_level: None,
    };
    let config = overrides.apply(storage.load()?)?;

    setup_logging(&config.log_level)?;
    setup_panic_hook();
    info!("Countdown display starting for project {}", args.project);

    let api: Arc<dyn ControlApi> = Arc::new(HttpControlApi::from_config(&config.api)?);
    let push: Option<Arc<dyn PushTransport>> = if config.push.enabled {
        Some(Arc::new(SocketIoTransport::from_config(&config.push)))
    } else {
        None
    };

    let project_id = ProjectId::from(args.project);
    let handle = SelectedTimerWatcher::spawn(project_id.clone(), api, push, &config.poll);
    let mut view_rx = handle.subscribe();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(project_id);
    app.set_view(view_rx.borrow_and_update().clone());

    let result = run(&mut terminal, &mut app, &mut view_rx).await;

    handle.close().await;
    info!("Selected timer watcher closed");

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    view_rx: &mut tokio::sync::watch::Receiver<countdown_client::SelectedView>,
) -> Result<()> {
    let mut watching = true;

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        tokio::select! {
            changed = view_rx.changed(), if watching => {
                match changed {
                    Ok(()) => app.set_view(view_rx.borrow_and_update().clone()),
                    Err(_) => {
                        tracing::warn!("Selected timer watcher stopped");
                        watching = false;
                    }
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(16)) => {
                if event::poll(Duration::from_millis(0))? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            app.handle_key(key.code, key.modifiers);
                        }
                        Event::Resize(width, height) => {
                            info!(width, height, "Terminal resized");
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
