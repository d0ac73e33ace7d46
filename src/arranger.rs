//! The orchestrator that ties the registry, layout calculator, debounce
//! timer and window manager together.
//!
//! [`Arranger`] owns the per-group [`GroupRegistry`] and reacts to
//! [`Command`]s and change notifications by recomputing the grid for the
//! current group and pushing the result to the [`WindowManager`].
//!
//! # States
//!
//! ```text
//!            change             deadline passed
//!   Idle ───────────▶ DebouncePending ───────────▶ Applying ──▶ Idle
//!     ▲                    │  ▲                                    │
//!     │                    └──┘ change (deadline pushed back)      │
//!     └────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Applying` lasts for one synchronous call and is not visible between
//! ticks.  Commands are handled every tick whatever the state.  Cancellation moves
//! the arranger to [`Phase::ShuttingDown`], after which only a final command
//! drain is expected.

use crate::command::{Command, GroupId, WindowId};
use crate::config::Config;
use crate::debounce::Debounce;
use crate::grid::{compute_positions, Rect};
use crate::registry::GroupRegistry;
use crate::traits::WindowManager;
use log::{debug, info, warn};
use std::time::Instant;

/// Possible errors from the arranger.
#[derive(Debug, thiserror::Error)]
pub enum ArrangerError {
    /// The window manager returned an error.
    #[error("window manager error: {0}")]
    WindowManager(String),
    /// The connection to the window manager is gone.
    #[error("lost connection to window manager: {0}")]
    Disconnected(String),
}

fn wm_err<W: WindowManager>(e: W::Error) -> ArrangerError {
    if W::is_disconnected(&e) {
        ArrangerError::Disconnected(e.to_string())
    } else {
        ArrangerError::WindowManager(e.to_string())
    }
}

/// Where the arranger is in its recompute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No recompute pending.
    Idle,
    /// A change was seen; a recompute is scheduled.
    DebouncePending,
    /// A recompute is being pushed to the window manager.
    ///
    /// Applying runs synchronously inside [`Arranger::apply_group`], so a
    /// caller on the owning thread never observes this label; `phase()`
    /// is back to [`Phase::Idle`] once the call returns.
    Applying,
    /// Cancellation was requested.
    ShuttingDown,
}

/// What a recompute did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The group is not in the tiled set; nothing was touched.
    NotTiled,
    /// The group has no windows; its stored order was dropped.
    Emptied,
    /// `windows` windows were laid out, `failures` of which could not be
    /// placed.
    Arranged { windows: usize, failures: usize },
}

/// Summary of one [`Arranger::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Commands drained this tick.
    pub commands: usize,
    /// Whether the debounced recompute fired.
    pub recomputed: bool,
}

/// Arranges the windows of the current group into a grid.
///
/// Generic over any [`WindowManager`], so it runs unchanged against X11 or
/// a test double.
///
/// # Typical usage
///
/// ```ignore
/// let mut arranger = Arranger::new(X11Wm::connect()?, config);
/// arranger.apply_current()?;
/// arranger.tick(rx.try_iter(), Instant::now());
/// ```
pub struct Arranger<W: WindowManager> {
    wm: W,
    config: Config,
    registry: GroupRegistry,
    debounce: Debounce,
    applying: bool,
    shutting_down: bool,
}

impl<W: WindowManager> Arranger<W> {
    /// Create a new arranger.  The debounce interval is taken from
    /// `config`.
    pub fn new(wm: W, config: Config) -> Self {
        let debounce = Debounce::new(config.debounce());
        Self {
            wm,
            config,
            registry: GroupRegistry::new(),
            debounce,
            applying: false,
            shutting_down: false,
        }
    }

    pub fn wm(&self) -> &W {
        &self.wm
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        if self.shutting_down {
            Phase::ShuttingDown
        } else if self.applying {
            Phase::Applying
        } else if self.debounce.is_pending() {
            Phase::DebouncePending
        } else {
            Phase::Idle
        }
    }

    /// Note a structural change observed at `now`; the recompute is deferred
    /// until the debounce interval passes without further changes.
    pub fn notify_change(&mut self, now: Instant) {
        self.debounce.notify(now);
    }

    /// Drain the window manager's pending change notifications.  Returns how
    /// many were seen.
    pub fn poll_changes(&mut self, now: Instant) -> Result<usize, ArrangerError> {
        let changes = self.wm.poll_changes().map_err(wm_err::<W>)?;
        for change in &changes {
            debug!("change: {:?}", change);
            self.notify_change(now);
        }
        Ok(changes.len())
    }

    /// One control-loop step: run every queued command in arrival order,
    /// then fire the debounced recompute if it is due.
    pub fn tick<I>(&mut self, commands: I, now: Instant) -> TickReport
    where
        I: IntoIterator<Item = Command>,
    {
        let commands = self.run_commands(commands);
        let recomputed = self.debounce.fire(now);
        if recomputed {
            debug!("debounce elapsed, re-arranging");
            if let Err(e) = self.apply_current() {
                warn!("re-arrange failed: {}", e);
            }
        }
        TickReport {
            commands,
            recomputed,
        }
    }

    /// Run `commands` in order, logging failures.  Returns how many ran.
    pub fn run_commands<I>(&mut self, commands: I) -> usize
    where
        I: IntoIterator<Item = Command>,
    {
        let mut count = 0;
        for cmd in commands {
            count += 1;
            if let Err(e) = self.handle(cmd) {
                warn!("{} failed: {}", cmd, e);
            }
        }
        count
    }

    /// Process a single [`Command`].
    ///
    /// Returns `Ok(true)` if the active window moved and the group was
    /// re-arranged, `Ok(false)` if the command was a no-op (untiled group,
    /// no active window, window not in the group, or already at the edge).
    pub fn handle(&mut self, cmd: Command) -> Result<bool, ArrangerError> {
        info!("{}", cmd);
        let group = self.wm.current_group().map_err(wm_err::<W>)?;
        if !self.config.should_tile(group) {
            debug!("group {} is not tiled, ignoring {}", group, cmd);
            return Ok(false);
        }

        let members = self.wm.list_group_members(group).map_err(wm_err::<W>)?;
        if members.is_empty() {
            self.registry.forget(group);
            return Ok(false);
        }
        self.registry.reconcile(group, &members);

        let Some(active) = self.wm.active_window().map_err(wm_err::<W>)? else {
            debug!("no active window");
            return Ok(false);
        };
        if self
            .registry
            .move_window(group, active, cmd.direction())
            .is_none()
        {
            debug!("{} cannot move {} in group {}", active, cmd.direction(), group);
            return Ok(false);
        }
        self.apply_group(group)?;
        Ok(true)
    }

    /// Re-arrange the group currently on screen.
    pub fn apply_current(&mut self) -> Result<ApplyOutcome, ArrangerError> {
        let group = self.wm.current_group().map_err(wm_err::<W>)?;
        self.apply_group(group)
    }

    /// Re-arrange `group`.
    ///
    /// Per-window failures are logged and counted but do not stop the
    /// remaining windows from being placed.
    pub fn apply_group(&mut self, group: GroupId) -> Result<ApplyOutcome, ArrangerError> {
        if !self.config.should_tile(group) {
            return Ok(ApplyOutcome::NotTiled);
        }
        let members = self.wm.list_group_members(group).map_err(wm_err::<W>)?;
        if members.is_empty() {
            self.registry.forget(group);
            return Ok(ApplyOutcome::Emptied);
        }
        let (width, height) = self.wm.screen_size().map_err(wm_err::<W>)?;
        let layout = self.config.layout_for(group);

        self.applying = true;
        let order = self.registry.reconcile(group, &members);
        let rects = compute_positions(order.len(), width, height, &layout);
        let mut failures = 0;
        for (&window, &rect) in order.iter().zip(&rects) {
            if let Err(e) = place(&self.wm, window, rect) {
                warn!("failed to place {}: {}", window, e);
                failures += 1;
            }
        }
        let windows = rects.len();
        self.applying = false;

        if let Err(e) = self.wm.flush() {
            warn!("flush failed: {}", e);
        }
        debug!(
            "group {}: arranged {} window(s) with layout {}",
            group, windows, layout
        );
        Ok(ApplyOutcome::Arranged { windows, failures })
    }

    /// Enter [`Phase::ShuttingDown`].  The debounce timer is disarmed; any
    /// pending recompute is abandoned.
    pub fn begin_shutdown(&mut self) {
        self.shutting_down = true;
        self.debounce = Debounce::new(self.debounce.interval());
    }
}

/// Unmaximize, undecorate and move one window.
fn place<W: WindowManager>(wm: &W, window: WindowId, rect: Rect) -> Result<(), W::Error> {
    wm.unmaximize(window)?;
    wm.strip_decorations(window)?;
    wm.set_geometry(window, rect)
}
