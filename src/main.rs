mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tui_choropleth::config::{AppConfig, LogConfig};
use tui_choropleth::slider::ChangeEvent;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "choropleth.toml")]
    config: PathBuf,
    /// Country to show; repeat to cycle between several
    #[arg(long = "country", value_name = "NAME")]
    countries: Vec<String>,
    /// CSV/TSV table with one row per region
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,
    /// Directory or http(s) base URL holding topojson/<country>.topojson
    #[arg(short, long, value_name = "SOURCE")]
    boundaries: Option<String>,
    /// Slider change event (JSON) supplying the initial ranges
    #[arg(long, value_name = "FILE")]
    ranges: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(AppConfig, Option<ChangeEvent>)> {
        let mut config = AppConfig::load_or_default(&self.config)?;
        if !self.countries.is_empty() {
            config.boundaries.countries = self.countries;
        }
        if let Some(source) = self.boundaries {
            config.boundaries.source = source;
        }
        if self.data.is_some() {
            config.data.path = self.data;
        }

        let event = match self.ranges {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading ranges from {}", path.display()))?;
                Some(ChangeEvent::from_json(&json)?)
            }
            None => None,
        };
        Ok((config, event))
    }
}

/// The terminal owns stdout, so logs go to a file
fn init_logging(config: &LogConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("opening log file {}", config.file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter)))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let (config, ranges) = Cli::parse().into_config()?;
    init_logging(&config.log)?;
    tracing::info!(
        source = %config.boundaries.source,
        countries = config.boundaries.countries.len(),
        "starting"
    );

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, config, ranges);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

/// Handle mouse events for clicking, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Press and release in place opens a popup; drag pans
        MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_press(mouse.column, mouse.row),
        MouseEventKind::Down(MouseButton::Right) => app.controller.close_popup(),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc if app.controller.popup().is_some() => app.controller.close_popup(),
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
        KeyCode::Char('f') | KeyCode::Char('0') => app.fit(),

        // Boundaries and data
        KeyCode::Char('n') => app.cycle_country(1),
        KeyCode::Char('N') => app.cycle_country(-1),
        KeyCode::Char('d') => app.reload_data(),

        // Slider
        KeyCode::Tab => app.select_segment(1),
        KeyCode::BackTab => app.select_segment(-1),
        KeyCode::Char(']') => app.move_thumb(1),
        KeyCode::Char('[') => app.move_thumb(-1),
        KeyCode::Char('}') => app.move_thumb(10),
        KeyCode::Char('{') => app.move_thumb(-10),
        KeyCode::Char('c') => app.cycle_color(),
        KeyCode::Char('t') => app.change_thumb_count(1),
        KeyCode::Char('T') => app.change_thumb_count(-1),
        KeyCode::Char('r') => app.reset_thumbs(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: AppConfig, ranges: Option<ChangeEvent>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, ranges, size.width as usize, size.height as usize)
        .context("starting background loader")?;
    app.start();

    // Main loop
    loop {
        app.tick();

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
