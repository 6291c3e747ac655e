use crate::board::Board;
use crate::config::DashboardConfig;
use crate::errors::BoardError;
use crate::hotkeys::{action_for_event, BoardAction};
use crate::logging::log_event;
use crate::scheduler::{refresh_pane, spawn_pane_worker, RefreshContext, RefreshKind, RefreshTrigger};
use crate::surface::Surface;
use crossterm::event::Event;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The one lock every surface write goes through.
pub type SharedBoard = Arc<Mutex<Board>>;

/// A pane thread that panicked mid-draw leaves the grid usable; keep going.
pub fn lock_board(board: &SharedBoard) -> MutexGuard<'_, Board> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Exiting,
}

struct PaneWorker {
    trigger: Arc<RefreshTrigger>,
    handle: Option<JoinHandle<()>>,
}

pub struct Dashboard {
    config: DashboardConfig,
    board: SharedBoard,
    context: Arc<RefreshContext>,
    workers: Vec<PaneWorker>,
    state: ControllerState,
}

impl Dashboard {
    pub fn new(
        config: DashboardConfig,
        surface: Box<dyn Surface>,
        context: RefreshContext,
    ) -> Result<Self, BoardError> {
        let board = Board::new(&config, surface)?;
        let (width, height) = board.surface().size();
        let placed = board
            .panes()
            .iter()
            .map(|pane| {
                let rect = pane.rect().map(|r| [r.top, r.left, r.bottom, r.right]);
                json!({"pane": pane.id(), "rect": rect})
            })
            .collect::<Vec<_>>();
        log_event(
            context.logger.as_ref(),
            "info",
            "layout",
            json!({
                "dashboard": config.name,
                "width": width,
                "height": height,
                "panes": placed,
            }),
        );
        Ok(Self {
            config,
            board: Arc::new(Mutex::new(board)),
            context: Arc::new(context),
            workers: Vec::new(),
            state: ControllerState::Running,
        })
    }

    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Draw the empty frame and start one refresh loop per pane.
    pub fn start(&mut self) -> Result<(), BoardError> {
        lock_board(&self.board).redraw_all()?;
        for (idx, pane) in self.config.panes.iter().enumerate() {
            let trigger = Arc::new(RefreshTrigger::new());
            let handle = spawn_pane_worker(
                Arc::clone(&self.board),
                idx,
                Arc::clone(pane),
                Arc::clone(&trigger),
                Arc::clone(&self.context),
            )?;
            self.workers.push(PaneWorker {
                trigger,
                handle: Some(handle),
            });
        }
        Ok(())
    }

    pub fn handle_action(&mut self, action: BoardAction) -> Result<ControllerState, BoardError> {
        match action {
            BoardAction::Resize { width, height } => {
                let rejected = lock_board(&self.board).resize(width, height)?;
                match rejected {
                    Some(reason) => log_event(
                        self.context.logger.as_ref(),
                        "warn",
                        "layout_rejected",
                        json!({"width": width, "height": height, "reason": reason}),
                    ),
                    None => log_event(
                        self.context.logger.as_ref(),
                        "info",
                        "layout",
                        json!({"width": width, "height": height}),
                    ),
                }
            }
            BoardAction::FocusNext | BoardAction::FocusPrevious => {
                let mut board = lock_board(&self.board);
                board.step_focus(action == BoardAction::FocusNext)?;
                let focused = board
                    .focus()
                    .and_then(|idx| board.pane(idx))
                    .map(|pane| pane.id().to_string());
                drop(board);
                log_event(
                    self.context.logger.as_ref(),
                    "debug",
                    "focus",
                    json!({"pane": focused}),
                );
            }
            BoardAction::RefreshFocused => {
                let focused = lock_board(&self.board).focus();
                if let Some(worker) = focused.and_then(|idx| self.workers.get(idx)) {
                    worker.trigger.request(RefreshKind::Manual);
                }
            }
            BoardAction::RefreshAll => {
                for worker in &self.workers {
                    worker.trigger.request(RefreshKind::ManualAll);
                }
            }
            BoardAction::ClearFocus => lock_board(&self.board).clear_highlight()?,
            BoardAction::Quit => self.state = ControllerState::Exiting,
        }
        Ok(self.state)
    }

    /// Serve terminal events until quit. Draw failures are logged and the
    /// loop continues; a closed channel ends it like a quit.
    pub fn run(&mut self, events: &mut mpsc::Receiver<Event>) -> Result<i32, BoardError> {
        while self.state == ControllerState::Running {
            let Some(event) = events.blocking_recv() else {
                self.state = ControllerState::Exiting;
                break;
            };
            let Some(action) = action_for_event(&event) else {
                continue;
            };
            if let Err(error) = self.handle_action(action) {
                log_event(
                    self.context.logger.as_ref(),
                    "warn",
                    "surface_error",
                    json!({"error": error.to_string()}),
                );
            }
        }
        log_event(self.context.logger.as_ref(), "info", "quit", json!({}));
        Ok(0)
    }

    /// Refresh every pane exactly once, in parallel, then return.
    pub fn refresh_all_once(&self) -> Result<(), BoardError> {
        lock_board(&self.board).redraw_all()?;
        std::thread::scope(|scope| {
            let handles = self
                .config
                .panes
                .iter()
                .enumerate()
                .map(|(idx, pane)| {
                    let board = &self.board;
                    let context = self.context.as_ref();
                    scope.spawn(move || {
                        refresh_pane(board, idx, pane, context, RefreshKind::Scheduled)
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                match handle.join() {
                    Ok(result) => {
                        result?;
                    }
                    Err(_) => {
                        return Err(BoardError::Process("pane refresh panicked".to_string()));
                    }
                }
            }
            Ok(())
        })
    }

    /// Stop every pane loop. Loops blocked in a command are detached; their
    /// results are discarded once the process exits.
    pub fn shutdown(&mut self, join: bool) {
        for worker in &self.workers {
            worker.trigger.shutdown();
        }
        if join {
            for worker in &mut self.workers {
                if let Some(handle) = worker.handle.take() {
                    let _ = handle.join();
                }
            }
        }
    }
}
