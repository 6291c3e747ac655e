use crate::board::LOADING_PLACEHOLDER;
use crate::cache::CacheStore;
use crate::config::PaneConfig;
use crate::dashboard::{lock_board, SharedBoard};
use crate::errors::BoardError;
use crate::logging::{log_event, JsonlLogger};
use crate::runtime::{Clock, CommandRequest, CommandRunner};
use serde_json::json;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefreshKind {
    /// Timer tick; a fresh cache entry is used instead of running the command.
    Scheduled,
    /// Operator asked for this pane; always executes.
    Manual,
    /// Operator asked for every pane; executes behind a loading placeholder.
    ManualAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Timer,
    Refresh(RefreshKind),
    Shutdown,
}

#[derive(Debug, Default)]
struct TriggerState {
    pending: Option<RefreshKind>,
    shutdown: bool,
}

/// Interruptible sleep for one pane loop. Requests arriving while the pane is
/// busy are coalesced and served after the current refresh.
#[derive(Debug, Default)]
pub struct RefreshTrigger {
    state: Mutex<TriggerState>,
    signal: Condvar,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, kind: RefreshKind) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = Some(state.pending.map_or(kind, |pending| pending.max(kind)));
        self.signal.notify_all();
    }

    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shutdown = true;
        self.signal.notify_all();
    }

    /// Blocks until a request, shutdown, or `timeout` elapses. `None` waits
    /// without a timer.
    pub fn wait(&self, timeout: Option<Duration>) -> Wake {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.shutdown {
                return Wake::Shutdown;
            }
            if let Some(kind) = state.pending.take() {
                return Wake::Refresh(kind);
            }
            state = match deadline {
                None => self
                    .signal
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Wake::Timer;
                    }
                    self.signal
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Services shared by every pane loop.
pub struct RefreshContext {
    pub runner: Arc<dyn CommandRunner>,
    pub cache: Arc<CacheStore>,
    pub clock: Arc<dyn Clock>,
    pub logger: Option<JsonlLogger>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Cached,
    Executed,
}

impl ContentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Executed => "executed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub content: String,
    pub status: String,
    pub source: ContentSource,
    pub elapsed: Duration,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Cached text when fresh and not forced, otherwise a real execution whose
/// output (error text included) becomes the content and is cached.
pub fn fetch_content(ctx: &RefreshContext, pane: &PaneConfig, force: bool) -> RefreshOutcome {
    if !force && ctx.cache.is_fresh(&pane.cache_key, pane.refresh_interval) {
        if let Ok(text) = ctx.cache.read(&pane.cache_key) {
            return RefreshOutcome {
                content: text,
                status: "cached".to_string(),
                source: ContentSource::Cached,
                elapsed: Duration::ZERO,
                exit_code: None,
                timed_out: false,
            };
        }
    }

    let started = ctx.clock.now();
    let result = ctx.runner.run(&CommandRequest {
        command: pane.command.clone(),
        shell: pane.shell.clone(),
        timeout: pane.timeout,
    });
    let elapsed = ctx
        .clock
        .now()
        .duration_since(started)
        .unwrap_or_default();

    match result {
        Ok(output) if output.timed_out => {
            let limit = pane.timeout.unwrap_or(elapsed).as_secs();
            RefreshOutcome {
                content: output.output,
                status: format!("timed out after {limit}s"),
                source: ContentSource::Executed,
                elapsed,
                exit_code: output.exit_code,
                timed_out: true,
            }
        }
        Ok(output) => {
            ctx.cache.write(&pane.cache_key, &output.output);
            RefreshOutcome {
                content: output.output,
                status: format!("took {}s", elapsed.as_secs()),
                source: ContentSource::Executed,
                elapsed,
                exit_code: output.exit_code,
                timed_out: false,
            }
        }
        Err(error) => RefreshOutcome {
            content: error.to_string(),
            status: format!("took {}s", elapsed.as_secs()),
            source: ContentSource::Executed,
            elapsed,
            exit_code: None,
            timed_out: false,
        },
    }
}

/// One full refresh of one pane. The command runs without the lock; only
/// the placeholder and the final draw take it.
pub fn refresh_pane(
    board: &SharedBoard,
    idx: usize,
    pane: &PaneConfig,
    ctx: &RefreshContext,
    kind: RefreshKind,
) -> Result<RefreshOutcome, BoardError> {
    match kind {
        RefreshKind::ManualAll => lock_board(board).show_loading(idx)?,
        RefreshKind::Manual => lock_board(board).set_status(idx, LOADING_PLACEHOLDER)?,
        RefreshKind::Scheduled => {}
    }

    let outcome = fetch_content(ctx, pane, kind != RefreshKind::Scheduled);
    log_event(
        ctx.logger.as_ref(),
        "info",
        "pane_refresh",
        json!({
            "pane": pane.id,
            "source": outcome.source.as_str(),
            "elapsed_ms": outcome.elapsed.as_millis() as u64,
            "exit_code": outcome.exit_code,
            "timed_out": outcome.timed_out,
        }),
    );

    lock_board(board).apply_refresh(idx, outcome.content.clone(), outcome.status.clone())?;
    Ok(outcome)
}

/// refresh → wait → repeat until shutdown. A zero interval refreshes once
/// and then only on request.
pub fn run_pane_loop(
    board: SharedBoard,
    idx: usize,
    pane: Arc<PaneConfig>,
    trigger: Arc<RefreshTrigger>,
    ctx: Arc<RefreshContext>,
) {
    let timer = pane.auto_refreshes().then_some(pane.refresh_interval);
    let mut kind = RefreshKind::Scheduled;
    loop {
        if let Err(error) = refresh_pane(&board, idx, &pane, &ctx, kind) {
            log_event(
                ctx.logger.as_ref(),
                "warn",
                "pane_refresh_failed",
                json!({"pane": pane.id, "error": error.to_string()}),
            );
        }
        kind = match trigger.wait(timer) {
            Wake::Timer => RefreshKind::Scheduled,
            Wake::Refresh(kind) => kind,
            Wake::Shutdown => return,
        };
    }
}

pub fn spawn_pane_worker(
    board: SharedBoard,
    idx: usize,
    pane: Arc<PaneConfig>,
    trigger: Arc<RefreshTrigger>,
    ctx: Arc<RefreshContext>,
) -> Result<JoinHandle<()>, BoardError> {
    std::thread::Builder::new()
        .name(format!("pane-{}", pane.id))
        .spawn(move || run_pane_loop(board, idx, pane, trigger, ctx))
        .map_err(|e| BoardError::Process(format!("spawn pane worker: {e}")))
}
