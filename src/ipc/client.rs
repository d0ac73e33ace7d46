//! Sending side of the command socket.

use crate::command::Command;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Errors from delivering a command to a running daemon.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to connect to {path}: {source}. Make sure the daemon is running")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to send command: {0}")]
    Write(#[from] std::io::Error),
}

/// Deliver `cmd` to the daemon listening at `path`.
///
/// Opens a connection, writes the token followed by a newline, and closes.
/// The daemon sends no reply.
pub fn send_command(path: impl AsRef<Path>, cmd: Command) -> Result<(), SendError> {
    let path = path.as_ref();
    let mut stream = UnixStream::connect(path).map_err(|source| SendError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    let payload = format!("{}\n", cmd.token());
    stream.write_all(payload.as_bytes())?;
    stream.flush()?;
    Ok(())
}
