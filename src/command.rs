//! Commands and identifiers shared by every component.
//!
//! [`Command`] is what arrives over the command socket, [`Direction`] is how
//! the [`GroupRegistry`](crate::registry::GroupRegistry) interprets it, and
//! [`WindowId`] / [`GroupId`] are the opaque handles the
//! [`WindowManager`](crate::traits::WindowManager) hands out.
//!
//! On the wire a command is a single token (`move-left`, `move-right`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque window handle, stable for the lifetime of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A workspace / desktop number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(GroupId)
    }
}

/// Which way to move a window inside its group's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the start of the order (left / up).
    Left,
    /// Towards the end of the order (right / down).
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Every action a client can request from the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Swap the active window with its predecessor.
    ReorderLeft,
    /// Swap the active window with its successor.
    ReorderRight,
}

impl Command {
    /// The direction the active window travels for this command.
    pub fn direction(self) -> Direction {
        match self {
            Command::ReorderLeft => Direction::Left,
            Command::ReorderRight => Direction::Right,
        }
    }

    /// The wire token for this command.
    pub fn token(self) -> &'static str {
        match self {
            Command::ReorderLeft => "move-left",
            Command::ReorderRight => "move-right",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The payload was not one of the known command tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Parse a wire token.  Surrounding whitespace (including the trailing
    /// newline) is ignored; the token itself is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "move-left" => Ok(Command::ReorderLeft),
            "move-right" => Ok(Command::ReorderRight),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}
