//! Core traits that decouple gridtile from any specific windowing system or
//! transport mechanism.
//!
//! The [`Arranger`](crate::arranger::Arranger) only talks to a
//! [`WindowManager`]; the daemon loop only receives from whatever
//! [`CommandSource`] was spawned for it.

use crate::command::{Command, GroupId, WindowId};
use crate::grid::Rect;
use std::sync::mpsc;

/// A structural change reported by the windowing system.
///
/// Any of these can alter the membership or visibility of a group, so each
/// one re-arms the debounce timer.  The arranger does not distinguish
/// between them beyond logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Destroyed,
    Configured,
    PropertyChanged,
}

/// Abstraction over the windowing system the arranger drives.
///
/// Queries that fail for a single window should be folded into "absent" by
/// the implementation (the window is left out of
/// [`list_group_members`](WindowManager::list_group_members)) rather than
/// returned as errors.  Mutations are best-effort: an `Err` from
/// [`set_geometry`](WindowManager::set_geometry) and friends is logged by the
/// caller and the next window is processed regardless.
pub trait WindowManager {
    /// The error type produced by this window manager.
    type Error: std::error::Error + Send + 'static;

    /// Visible, non-dock, non-desktop windows on `group`, in the window
    /// manager's native stacking order.
    fn list_group_members(&self, group: GroupId) -> Result<Vec<WindowId>, Self::Error>;

    /// The focused window, or `None` if nothing is focused.
    fn active_window(&self) -> Result<Option<WindowId>, Self::Error>;

    /// The group currently shown on screen.
    fn current_group(&self) -> Result<GroupId, Self::Error>;

    /// Number of groups the window manager has, if it reports one.
    fn group_count(&self) -> Result<Option<u32>, Self::Error>;

    /// Screen size in pixels as `(width, height)`.
    fn screen_size(&self) -> Result<(u32, u32), Self::Error>;

    /// Move and resize `window`.
    fn set_geometry(&self, window: WindowId, rect: Rect) -> Result<(), Self::Error>;

    /// Clear the maximized state so the window accepts a new geometry.
    fn unmaximize(&self, window: WindowId) -> Result<(), Self::Error>;

    /// Ask the window manager to drop title bars and borders.
    fn strip_decorations(&self, window: WindowId) -> Result<(), Self::Error>;

    /// Drain pending change notifications without blocking.
    fn poll_changes(&self) -> Result<Vec<Change>, Self::Error>;

    /// Push any buffered requests to the window manager.
    fn flush(&self) -> Result<(), Self::Error>;

    /// Whether `error` means the connection to the window manager is gone
    /// for good, as opposed to one failed request.
    fn is_disconnected(error: &Self::Error) -> bool {
        let _ = error;
        false
    }
}

/// A source of [`Command`]s.
///
/// Implementations listen on some transport and forward parsed commands into
/// the provided [`mpsc::Sender`].  The receiving end is drained by the
/// control loop once per tick, which gives first-in first-out delivery
/// without any explicit locking on either side.
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is cancelled,
///   exhausted, or hits an unrecoverable error.
/// * Each received command must be sent through `sink` exactly once, in
///   arrival order.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}


#[cfg(test)]
mod tests {
    use super::mock::MockError;
    use super::*;
    use std::sync::mpsc;

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn commands_drain_in_fifo_order() {
        let mut src = MockSource {
            commands: vec![
                Command::ReorderLeft,
                Command::ReorderRight,
                Command::ReorderRight,
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(
            cmds,
            vec![
                Command::ReorderLeft,
                Command::ReorderRight,
                Command::ReorderRight
            ]
        );
        // A second drain finds nothing.
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn source_on_thread_delivers_everything() {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let mut src = MockSource {
                commands: vec![Command::ReorderRight, Command::ReorderLeft],
            };
            src.run(tx)
        });
        handle.join().unwrap().unwrap();
        let cmds: Vec<Command> = rx.iter().collect();
        assert_eq!(cmds, vec![Command::ReorderRight, Command::ReorderLeft]);
    }
}
