//! **gridtile**: a grid-tiling arrangement daemon for EWMH desktops.
//!
//! The windows of a desktop are laid out in a grid of near-square rows.
//! Each desktop remembers the order of its windows, so opening or closing
//! one window does not shuffle the rest, and the active window can be moved
//! left or right through a local Unix socket.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowManager`] abstracts the windowing system so the
//!   arrangement logic is not coupled to X11.
//! * [`traits::CommandSource`] abstracts the transport that delivers reorder
//!   requests so the control loop is not coupled to any IPC mechanism.
//!
//! The pure pieces ([`grid`], [`registry`], [`debounce`]) are driven by
//! [`arranger::Arranger`], which [`daemon`] ticks in a loop.  Concrete
//! implementations live in [`x11`] (EWMH over x11rb) and [`ipc`]
//! (Unix-socket listener and client).

pub mod arranger;
pub mod cancel;
pub mod cli;
pub mod command;
pub mod config;
pub mod daemon;
pub mod debounce;
pub mod grid;
pub mod ipc;
pub mod registry;
pub mod traits;
pub mod x11;
