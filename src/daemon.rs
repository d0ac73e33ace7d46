//! The long-running control loop.
//!
//! [`run`] starts the command listener, arranges the current group once,
//! and then ticks every [`TICK`] until the [`CancelToken`] is cancelled:
//!
//! 1. drain window-manager change notifications (non-blocking),
//! 2. run every queued command in arrival order,
//! 3. fire the debounced recompute if it is due,
//! 4. sleep.
//!
//! Nothing in the loop blocks beyond that sleep.  The listener is the only
//! other thread; the two share nothing but the command channel and the
//! cancellation token.

use crate::arranger::{Arranger, ArrangerError};
use crate::cancel::CancelToken;
use crate::command::Command;
use crate::ipc::listener;
use crate::traits::WindowManager;
use log::{debug, error, info, warn};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Sleep between control-loop iterations.
pub const TICK: Duration = Duration::from_millis(50);

/// Run the daemon until `cancel` fires or the window manager goes away.
///
/// If the command socket cannot be bound, remote reordering is disabled for
/// the session and the loop runs regardless.
pub fn run<W: WindowManager>(arranger: &mut Arranger<W>, cancel: &CancelToken, tick: Duration) {
    let (tx, rx) = mpsc::channel::<Command>();
    let socket = arranger.config().socket_path();
    let listener = match listener::spawn(&socket, cancel.clone(), tx) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("{}; remote reordering disabled", e);
            None
        }
    };

    run_loop(arranger, &rx, cancel, tick);

    if let Some(handle) = listener {
        handle.shutdown();
    }
    info!("daemon stopped");
}

/// The control loop proper, without the listener.
///
/// Runs until `cancel` fires or the window manager connection is lost.
/// Either way, commands already queued in `commands` are run one last time
/// before returning.
pub fn run_loop<W: WindowManager>(
    arranger: &mut Arranger<W>,
    commands: &mpsc::Receiver<Command>,
    cancel: &CancelToken,
    tick: Duration,
) {
    if let Err(e) = arranger.apply_current() {
        warn!("initial arrangement failed: {}", e);
    }

    while !cancel.is_cancelled() {
        match arranger.poll_changes(Instant::now()) {
            Ok(_) => {}
            Err(e @ ArrangerError::Disconnected(_)) => {
                error!("{}", e);
                break;
            }
            Err(e) => warn!("failed to poll window manager events: {}", e),
        }
        arranger.tick(commands.try_iter(), Instant::now());
        std::thread::sleep(tick);
    }

    info!("shutting down");
    arranger.begin_shutdown();
    let drained = arranger.run_commands(commands.try_iter());
    if drained > 0 {
        debug!("ran {} queued command(s) during shutdown", drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arranger::Phase;
    use crate::command::{GroupId, WindowId};
    use crate::config::Config;
    use crate::ipc::client::send_command;
    use crate::traits::mock::MockWm;
    use crate::traits::Change;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};

    const G: GroupId = GroupId(1);
    const A: WindowId = WindowId(0xa);
    const B: WindowId = WindowId(0xb);
    const C: WindowId = WindowId(0xc);

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "gridtile-daemon-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    fn config(socket: &Path) -> Config {
        Config {
            socket: Some(socket.to_path_buf()),
            debounce_ms: 20,
            ..Config::default()
        }
    }

    /// Cancel `token` after `delay` from a helper thread.
    fn cancel_after(token: &CancelToken, delay: Duration) -> std::thread::JoinHandle<()> {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            token.cancel();
        })
    }

    #[test]
    fn loop_arranges_on_start_and_exits_on_cancel() {
        let mut arr = Arranger::new(MockWm::with_group(G, &[A, B]), Config::default());
        let (_tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let helper = cancel_after(&cancel, Duration::from_millis(100));

        run_loop(&mut arr, &rx, &cancel, Duration::from_millis(5));
        helper.join().unwrap();

        assert_eq!(arr.wm().placed_windows(), vec![A, B]);
        assert_eq!(arr.phase(), Phase::ShuttingDown);
    }

    #[test]
    fn already_cancelled_still_drains_queue() {
        let mut arr = Arranger::new(MockWm::with_group(G, &[A, B, C]), Config::default());
        arr.wm().active.set(Some(A));
        let (tx, rx) = mpsc::channel();
        tx.send(Command::ReorderRight).unwrap();
        tx.send(Command::ReorderRight).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        run_loop(&mut arr, &rx, &cancel, TICK);

        assert_eq!(arr.registry().order(G), Some(&[B, C, A][..]));
    }

    #[test]
    fn change_notification_triggers_recompute() {
        let wm = MockWm::with_group(G, &[A]);
        let mut arr = Arranger::new(
            wm,
            Config {
                debounce_ms: 10,
                ..Config::default()
            },
        );
        let (_tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        arr.wm().set_members(G, &[A, B]);
        arr.wm().push_change(Change::Created);
        let helper = cancel_after(&cancel, Duration::from_millis(150));

        run_loop(&mut arr, &rx, &cancel, Duration::from_millis(5));
        helper.join().unwrap();

        // Initial pass with [A, B], then exactly one debounced pass.
        assert_eq!(arr.wm().placed_windows(), vec![A, B, A, B]);
    }

    #[test]
    fn lost_connection_ends_the_loop() {
        let mut arr = Arranger::new(MockWm::with_group(G, &[A, B]), Config::default());
        arr.wm().active.set(Some(A));
        arr.wm().disconnected.set(true);
        let (tx, rx) = mpsc::channel();
        tx.send(Command::ReorderRight).unwrap();
        let cancel = CancelToken::new();

        // Backstop in case the loop ignores the lost connection.
        let _backstop = cancel_after(&cancel, Duration::from_secs(5));
        let start = Instant::now();
        run_loop(&mut arr, &rx, &cancel, Duration::from_millis(5));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!cancel.is_cancelled());

        assert_eq!(arr.phase(), Phase::ShuttingDown);
        // The queued command still ran during the final drain.
        assert_eq!(arr.registry().order(G), Some(&[B, A][..]));
    }

    #[test]
    fn socket_commands_reach_the_arranger() {
        let path = tmp_socket_path();
        let mut arr = Arranger::new(MockWm::with_group(G, &[A, B, C]), config(&path));
        arr.wm().active.set(Some(C));
        let cancel = CancelToken::new();

        let sender = {
            let path = path.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !path.exists() && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(10));
                }
                send_command(&path, Command::ReorderLeft).unwrap();
                send_command(&path, Command::ReorderLeft).unwrap();
                std::thread::sleep(Duration::from_millis(300));
                cancel.cancel();
            })
        };

        run(&mut arr, &cancel, Duration::from_millis(10));
        sender.join().unwrap();

        assert_eq!(arr.registry().order(G), Some(&[C, A, B][..]));
        assert!(!path.exists());
    }

    #[test]
    fn unusable_socket_does_not_stop_the_loop() {
        let path = std::env::temp_dir()
            .join("gridtile-missing-dir")
            .join("sub")
            .join("daemon.sock");
        let mut arr = Arranger::new(MockWm::with_group(G, &[A]), config(&path));
        let cancel = CancelToken::new();
        let helper = cancel_after(&cancel, Duration::from_millis(50));

        run(&mut arr, &cancel, Duration::from_millis(5));
        helper.join().unwrap();

        assert_eq!(arr.wm().placed_windows(), vec![A]);
    }
}
