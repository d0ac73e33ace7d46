//! X11-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`WindowManager`](crate::traits::WindowManager) trait, talking to an
//! EWMH-compliant window manager through the X server.
//!
//! Nothing outside this module should reference X11 directly.

pub mod wm;
