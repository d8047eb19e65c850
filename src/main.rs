use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use millwatch::app::{App, AppOptions, View};
use millwatch::config::Settings;
use millwatch::data::duration::parse_duration;
use millwatch::data::{report, QualityThresholds};
use millwatch::source::{DataSource, DatasetCache, FileSource, SheetAuth, SheetsSource};
use millwatch::ui::{self, Theme};
use millwatch::visits::VisitLog;
use millwatch::events;

#[derive(Parser, Debug)]
#[command(name = "millwatch")]
#[command(about = "Terminal dashboard for yarn quality across spinning machines and batches")]
struct Args {
    /// Configuration file (defaults to ./millwatch.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read the dataset from a local JSON export instead of the sheet
    #[arg(short, long, conflicts_with = "sheet_id")]
    file: Option<PathBuf>,

    /// Spreadsheet id, overrides sheet.id from the configuration
    #[arg(short, long)]
    sheet_id: Option<String>,

    /// Export the latest batch report to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Log file (the terminal is taken by the dashboard)
    #[arg(long, default_value = "millwatch.log")]
    log_file: PathBuf,

    /// How often the dashboard re-checks the cache (e.g. "60s", "5m")
    #[arg(short, long, default_value = "60s")]
    refresh: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(id) = args.sheet_id.clone() {
        settings.sheet.id = Some(id);
    }
    let refresh = parse_duration(&args.refresh).context("Invalid --refresh")?;

    let source = build_source(args.file.as_deref(), &settings)?;
    info!(source = source.description(), "Starting millwatch");

    let thresholds = QualityThresholds::default();

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        return export_to_file(
            source,
            &export_path,
            &thresholds,
            settings.display.batch_display_offset,
        );
    }

    let users = settings.user_directory();
    if users.is_empty() {
        bail!("No users configured: add a [users.<login>] section to the configuration");
    }

    // The dashboard stays usable without the visit log
    let visits = match VisitLog::open(&settings.visits.database) {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(
                path = %settings.visits.database.display(),
                error = %e,
                "Visit log unavailable"
            );
            None
        }
    };

    let options = AppOptions {
        thresholds,
        cache_ttl: settings.sheet.cache_ttl()?,
        active_window: settings.visits.active_window()?,
        display: settings.display.clone(),
        ..AppOptions::default()
    };

    let cache = DatasetCache::new(source);
    let app = App::new(cache, users, visits, options).with_theme(Theme::auto_detect());
    run_tui(app, refresh)
}

/// Write tracing output to a file so it does not disturb the alternate screen.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Pick the data source: a local file when given, otherwise the sheet.
fn build_source(file: Option<&Path>, settings: &Settings) -> Result<Box<dyn DataSource>> {
    if let Some(path) = file {
        return Ok(Box::new(FileSource::new(path)));
    }

    let sheet = &settings.sheet;
    let Some(ref id) = sheet.id else {
        bail!("No data source: pass --file, --sheet-id or set sheet.id in the configuration");
    };

    let auth = SheetAuth::resolve(sheet.credentials.as_deref(), sheet.api_key.as_deref())?;
    let source = SheetsSource::builder(id.clone())
        .range(sheet.range.clone())
        .auth(auth)
        .timeout(sheet.timeout()?)
        .retry(sheet.retry_policy()?)
        .build()?;
    Ok(Box::new(source))
}

/// Run the TUI until the user quits
fn run_tui(mut app: App, refresh_interval: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app, refresh_interval);

    // A failed draw must still close the open visit
    if app.running {
        app.quit();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5u16.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            if !app.session.is_authenticated() {
                ui::login::render(frame, app, area);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            // Load failures replace the content, except for the admin view
            // which does not depend on the dataset
            match (&app.load_error, app.current_view) {
                (_, View::Admin) => ui::admin::render(frame, app, chunks[2]),
                (Some(err), _) => ui::common::render_error(frame, app, chunks[2], err),
                (None, View::Overview) => ui::overview::render(frame, app, chunks[2]),
                (None, View::Analytics) => ui::analytics::render(frame, app, chunks[2]),
                (None, View::Compare) => ui::compare::render(frame, app, chunks[2]),
                (None, View::Machines) => ui::machines::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1)
                    events::handle_mouse_event(app, mouse, 2);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        // Periodic reload goes through the cache, so the source is only hit
        // once the TTL has expired
        if app.session.is_authenticated() && last_refresh.elapsed() >= refresh_interval {
            app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}

/// Load the dataset once and write the latest batch report.
fn export_to_file(
    mut source: Box<dyn DataSource>,
    export_path: &Path,
    thresholds: &QualityThresholds,
    display_offset: i64,
) -> Result<()> {
    let table = source
        .load()
        .with_context(|| format!("Failed to load {}", source.description()))?;
    report::export(&table, thresholds, display_offset, export_path)?;

    info!(path = %export_path.display(), "Exported batch report");
    println!("Exported batch report to: {}", export_path.display());
    Ok(())
}
