pub mod board;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod hotkeys;
pub mod layout;
pub mod log_retention;
pub mod logging;
pub mod pane;
pub mod runtime;
pub mod scheduler;
pub mod surface;
pub mod types;

use cache::CacheStore;
use clap::{error::ErrorKind, Parser};
use config::{dashboard_names, load_config, resolve_dashboard, AppConfig};
use dashboard::{lock_board, Dashboard, EVENT_CHANNEL_CAPACITY};
use errors::BoardError;
use logging::{log_event, JsonlLogger};
use ratatui::backend::{CrosstermBackend, TestBackend};
use runtime::ProductionRuntime;
use scheduler::RefreshContext;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surface::{CellSurface, TerminalGuard};
use tokio::sync::mpsc;

pub const DEFAULT_SNAPSHOT_SIZE: (u16, u16) = (80, 24);

#[derive(Debug, Clone, Parser)]
#[command(name = "paneboard")]
#[command(about = "Grid of self-refreshing shell command panes")]
#[command(after_help = hotkeys::controls_legend())]
pub struct Cli {
    /// Dashboard to open, as named in the config file.
    pub dashboard: Option<String>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Refresh every pane once and print the frame instead of going interactive.
    #[arg(long, default_value_t = false)]
    pub snapshot: bool,
    /// Canvas size for --snapshot, e.g. 120x40.
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u16, u16)>,
}

pub fn parse_size(raw: &str) -> Result<(u16, u16), String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u16>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| format!("invalid dimension `{part}` in `{raw}`"))
    };
    Ok((parse(width)?, parse(height)?))
}

pub fn run() -> Result<i32, BoardError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, home.as_deref(), &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    home: Option<&Path>,
    runtime: &ProductionRuntime,
) -> Result<i32, BoardError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(BoardError::Cli(error.to_string())),
        },
    };

    let cfg = load_config(cli.config.as_deref(), home, runtime.file_system.as_ref())?;
    let Some(name) = cli.dashboard.as_deref() else {
        println!("Which dashboard? [{}]", dashboard_names(&cfg).join(", "));
        return Ok(1);
    };
    let dashboard_cfg = resolve_dashboard(&cfg, name)?;
    let context = refresh_context(&cfg, name, runtime);
    let cache_dir = cfg
        .cache
        .dir
        .as_ref()
        .filter(|_| cfg.cache.enabled)
        .map(|dir| dir.display().to_string());
    log_event(
        context.logger.as_ref(),
        "info",
        "startup",
        json!({
            "dashboard": name,
            "panes": dashboard_cfg.panes.len(),
            "snapshot": cli.snapshot,
            "cache_dir": cache_dir,
        }),
    );

    if cli.snapshot {
        let (width, height) = cli.size.unwrap_or((
            dashboard_cfg.width.unwrap_or(DEFAULT_SNAPSHOT_SIZE.0),
            dashboard_cfg.height.unwrap_or(DEFAULT_SNAPSHOT_SIZE.1),
        ));
        let surface = CellSurface::new(TestBackend::new(width, height))?;
        let dashboard = Dashboard::new(dashboard_cfg, Box::new(surface), context)?;
        dashboard.refresh_all_once()?;
        let frame = lock_board(dashboard.board()).snapshot_text();
        print!("{frame}");
        return Ok(0);
    }

    // Layout problems surface as errors before the terminal is taken over.
    let surface = CellSurface::new(CrosstermBackend::new(std::io::stdout()))?;
    let mut dashboard = Dashboard::new(dashboard_cfg, Box::new(surface), context)?;
    let guard = TerminalGuard::enter()?;
    let mut events = spawn_event_reader()?;
    let code = dashboard.start().and_then(|()| dashboard.run(&mut events));
    // Loops stuck in a long command are left behind rather than joined.
    dashboard.shutdown(false);
    drop(guard);
    code
}

fn refresh_context(cfg: &AppConfig, dashboard: &str, runtime: &ProductionRuntime) -> RefreshContext {
    let fs = Arc::clone(&runtime.file_system);
    let clock = Arc::clone(&runtime.clock);
    let cache = match (&cfg.cache.dir, cfg.cache.enabled) {
        (Some(dir), true) => CacheStore::new(dir, fs, Arc::clone(&clock)),
        _ => CacheStore::disabled(fs, Arc::clone(&clock)),
    };
    let logger = cfg
        .logging
        .dir
        .as_deref()
        .map(|dir| JsonlLogger::for_dashboard(dir, dashboard, cfg.logging.budget_bytes));
    RefreshContext {
        runner: Arc::clone(&runtime.command_runner),
        cache: Arc::new(cache),
        clock,
        logger,
    }
}

/// Forward terminal events to the controller. The thread ends when the
/// controller drops its receiver or the terminal stops producing events.
fn spawn_event_reader() -> Result<mpsc::Receiver<crossterm::event::Event>, BoardError> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    std::thread::Builder::new()
        .name("terminal-events".to_string())
        .spawn(move || {
            while let Ok(event) = crossterm::event::read() {
                if tx.blocking_send(event).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| BoardError::Io(format!("spawn event reader: {e}")))?;
    Ok(rx)
}
