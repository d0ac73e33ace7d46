//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.  Each
//! connection carries exactly one command token; the listener reads it,
//! closes the connection, and only then accepts the next one.  A client
//! that stays silent for [`READ_TIMEOUT`] is dropped.
//!
//! # Wire format
//!
//! ```text
//! move-left\n
//! move-right\n
//! ```
//!
//! Anything else is dropped without a reply.

use crate::cancel::CancelToken;
use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{ErrorKind, Read};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Upper bound on a single command payload.
const MAX_COMMAND_LEN: usize = 128;

/// How long a connected client may stay silent before it is dropped.
pub const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Pause after a failed `accept` before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A [`CommandSource`] that listens on a Unix stream socket for command
/// tokens.
pub struct UnixSocketListener {
    path: PathBuf,
    listener: UnixListener,
    cancel: CancelToken,
}

/// Errors produced by the command socket.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to bind command socket {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to spawn listener thread: {0}")]
    Spawn(std::io::Error),
}

impl UnixSocketListener {
    /// Bind a new listener at `path`, replacing a stale socket file if one
    /// is left over from a previous run.
    ///
    /// The listener stops accepting once `cancel` is observed after a
    /// blocking accept returns.
    pub fn bind(path: impl AsRef<Path>, cancel: CancelToken) -> Result<Self, ChannelError> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).map_err(|source| ChannelError::Bind {
            path: path.clone(),
            source,
        })?;
        info!("listening on {}", path.display());
        Ok(Self {
            path,
            listener,
            cancel,
        })
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for UnixSocketListener {
    type Error = ChannelError;

    /// Accept connections until cancelled or until the receiving end of
    /// `sink` is dropped.
    ///
    /// This method **blocks**.  Run it on a dedicated thread, or use
    /// [`spawn`] which also takes care of waking it up on shutdown.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        for stream in self.listener.incoming() {
            if !self.handle_incoming(stream, &sink) {
                break;
            }
        }
        debug!("command listener stopped");
        Ok(())
    }
}

impl UnixSocketListener {
    /// Handle one result of `accept`.  Returns `false` when the listener
    /// should stop.
    fn handle_incoming(
        &self,
        stream: std::io::Result<UnixStream>,
        sink: &mpsc::Sender<Command>,
    ) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match stream {
            Ok(mut stream) => {
                if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
                    debug!("failed to set read timeout: {}", e);
                    return true;
                }
                let Some(cmd) = read_command(&mut stream) else {
                    return true;
                };
                debug!("received {}", cmd);
                if sink.send(cmd).is_err() {
                    info!("sink closed, shutting down");
                    return false;
                }
                true
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => true,
            Err(e) => {
                error!("accept error: {}", e);
                std::thread::sleep(ACCEPT_BACKOFF);
                !self.cancel.is_cancelled()
            }
        }
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Read one payload from `stream` and decode it.  Malformed input yields
/// `None`.
fn read_command(stream: &mut impl Read) -> Option<Command> {
    let mut buf = [0u8; MAX_COMMAND_LEN];
    let len = match stream.read(&mut buf) {
        Ok(0) => return None,
        Ok(len) => len,
        Err(e) => {
            debug!("read error: {}", e);
            return None;
        }
    };
    let text = match std::str::from_utf8(&buf[..len]) {
        Ok(text) => text,
        Err(_) => {
            debug!("discarding non-utf8 payload ({} bytes)", len);
            return None;
        }
    };
    match text.parse() {
        Ok(cmd) => Some(cmd),
        Err(e) => {
            debug!("discarding payload: {}", e);
            None
        }
    }
}

/// A listener running on its own thread.
///
/// Dropping the handle leaves the thread running; call
/// [`shutdown`](ListenerHandle::shutdown) to stop it.
pub struct ListenerHandle {
    path: PathBuf,
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

/// Bind the socket at `path` and run a [`UnixSocketListener`] on a new
/// thread, forwarding commands into `sink`.
///
/// Binding happens before this returns, so a setup failure is reported to
/// the caller instead of the thread.  If the thread cannot be started the
/// socket file is removed again.
pub fn spawn(
    path: impl AsRef<Path>,
    cancel: CancelToken,
    sink: mpsc::Sender<Command>,
) -> Result<ListenerHandle, ChannelError> {
    let mut listener = UnixSocketListener::bind(path, cancel.clone())?;
    let path = listener.path().to_path_buf();
    let thread = std::thread::Builder::new()
        .name("gridtile-ipc".into())
        .spawn(move || {
            if let Err(e) = listener.run(sink) {
                error!("command listener error: {}", e);
            }
        })
        .map_err(ChannelError::Spawn)?;
    Ok(ListenerHandle {
        path,
        cancel,
        thread,
    })
}

impl ListenerHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the listener thread and remove the socket file.
    ///
    /// Cancels the token (if it was not already), then connects to the
    /// socket once so the thread's blocking accept returns and sees the
    /// cancellation.  Waits for the thread to exit.
    pub fn shutdown(self) {
        self.cancel.cancel();
        let woken = self.thread.is_finished() || self.wake();
        if woken && self.thread.join().is_err() {
            error!("command listener thread panicked");
        }
        let _ = std::fs::remove_file(&self.path);
        debug!("removed {}", self.path.display());
    }

    /// Connect once so a blocking `accept` returns.
    fn wake(&self) -> bool {
        match UnixStream::connect(&self.path) {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "could not wake command listener at {}: {}; leaving it detached",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}

//  Tests
