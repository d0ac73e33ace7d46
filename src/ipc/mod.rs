//! Command socket.
//!
//! Key-bind helpers talk to the daemon by connecting to a Unix socket and
//! writing a single token (`move-left` or `move-right`).  [`listener`] is the
//! daemon side, [`client`] the sending side used by `gridtile --move-*`.

pub mod client;
pub mod listener;
