//! [`WindowManager`] implementation backed by X11 / EWMH.
//!
//! gridtile is not itself a window manager: it reads the EWMH hints the
//! running window manager publishes on the root window
//! (`_NET_CLIENT_LIST_STACKING`, `_NET_CURRENT_DESKTOP`, ...) and moves
//! client windows with plain `ConfigureWindow` requests.

use crate::command::{GroupId, WindowId};
use crate::grid::Rect;
use crate::traits::{Change, WindowManager};
use log::debug;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConfigureWindowAux,
    ConnectionExt as _, EventMask, MapState, PropMode, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_CLIENT_LIST_STACKING,
        _NET_ACTIVE_WINDOW,
        _NET_CURRENT_DESKTOP,
        _NET_NUMBER_OF_DESKTOPS,
        _NET_WM_DESKTOP,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_STATE,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _MOTIF_WM_HINTS,
    }
}

/// `_NET_WM_DESKTOP` value for windows shown on every desktop.
const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// `_NET_WM_STATE` client-message action.
const NET_WM_STATE_REMOVE: u32 = 0;

/// `_MOTIF_WM_HINTS` with only the decorations flag set and no decorations.
const MOTIF_NO_DECORATIONS: [u32; 5] = [2, 0, 0, 0, 0];

/// X11-backed window manager handle.
pub struct X11Wm {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

/// Errors that can occur when talking to the X server.
#[derive(Debug, thiserror::Error)]
pub enum X11WmError {
    #[error("failed to connect to X server: {0}. Is DISPLAY set?")]
    Connect(#[from] ConnectError),
    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),
    #[error("X server has no screen {0}")]
    NoScreen(usize),
}

impl X11Wm {
    /// Connect to the display named by `$DISPLAY` and intern the atoms.
    pub fn connect() -> Result<Self, X11WmError> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or(X11WmError::NoScreen(screen_num))?;
        let atoms = Atoms::new(&conn)?.reply()?;
        Ok(Self { conn, root, atoms })
    }

    /// Ask for the root-window events that [`poll_changes`] reports.
    ///
    /// [`poll_changes`]: WindowManager::poll_changes
    pub fn subscribe(&self) -> Result<(), X11WmError> {
        let mask = EventMask::PROPERTY_CHANGE
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY;
        let aux = ChangeWindowAttributesAux::new().event_mask(mask);
        self.conn
            .change_window_attributes(self.root, &aux)?
            .check()?;
        Ok(())
    }

    /// Read a 32-bit property of the given type.
    ///
    /// A missing property, a type mismatch, or an X error for the window
    /// (typically because it was just destroyed) all read as `None`.  Only a
    /// broken connection is an error.
    fn property32(
        &self,
        window: Window,
        property: Atom,
        type_: AtomEnum,
    ) -> Result<Option<Vec<u32>>, X11WmError> {
        let cookie = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)?;
        let reply = match cookie.reply() {
            Ok(reply) => reply,
            Err(ReplyError::X11Error(e)) => {
                debug!("property {} on 0x{:x}: {:?}", property, window, e.error_kind);
                return Ok(None);
            }
            Err(ReplyError::ConnectionError(e)) => return Err(e.into()),
        };
        if reply.type_ != u32::from(type_) || reply.format != 32 {
            return Ok(None);
        }
        Ok(reply.value32().map(Iterator::collect))
    }

    /// First value of a 32-bit property.
    fn first32(
        &self,
        window: Window,
        property: Atom,
        type_: AtomEnum,
    ) -> Result<Option<u32>, X11WmError> {
        Ok(self
            .property32(window, property, type_)?
            .and_then(|values| values.first().copied()))
    }

    fn is_dock_or_desktop(&self, window: Window) -> Result<bool, X11WmError> {
        let types = self
            .property32(window, self.atoms._NET_WM_WINDOW_TYPE, AtomEnum::ATOM)?
            .unwrap_or_default();
        Ok(contains_any(
            &types,
            &[
                self.atoms._NET_WM_WINDOW_TYPE_DOCK,
                self.atoms._NET_WM_WINDOW_TYPE_DESKTOP,
            ],
        ))
    }

    fn window_group(&self, window: Window) -> Result<Option<GroupId>, X11WmError> {
        let desktop = self.first32(window, self.atoms._NET_WM_DESKTOP, AtomEnum::CARDINAL)?;
        Ok(desktop.and_then(group_of_desktop))
    }

    fn is_viewable(&self, window: Window) -> Result<bool, X11WmError> {
        match self.conn.get_window_attributes(window)?.reply() {
            Ok(attrs) => Ok(attrs.map_state == MapState::VIEWABLE),
            Err(ReplyError::X11Error(_)) => Ok(false),
            Err(ReplyError::ConnectionError(e)) => Err(e.into()),
        }
    }
}

/// Map a `_NET_WM_DESKTOP` value to a group; sticky windows belong to none.
fn group_of_desktop(desktop: u32) -> Option<GroupId> {
    (desktop != ALL_DESKTOPS).then_some(GroupId(desktop))
}

fn contains_any(values: &[u32], wanted: &[u32]) -> bool {
    values.iter().any(|v| wanted.contains(v))
}

fn classify(event: &Event) -> Option<Change> {
    match event {
        Event::CreateNotify(_) => Some(Change::Created),
        Event::DestroyNotify(_) => Some(Change::Destroyed),
        Event::ConfigureNotify(_) => Some(Change::Configured),
        Event::PropertyNotify(_) => Some(Change::PropertyChanged),
        _ => None,
    }
}

//  WindowManager implementation

impl WindowManager for X11Wm {
    type Error = X11WmError;

    fn list_group_members(&self, group: GroupId) -> Result<Vec<WindowId>, Self::Error> {
        let stacking = self
            .property32(self.root, self.atoms._NET_CLIENT_LIST_STACKING, AtomEnum::WINDOW)?
            .unwrap_or_default();
        let mut members = Vec::new();
        for window in stacking {
            if self.is_dock_or_desktop(window)?
                || self.window_group(window)? != Some(group)
                || !self.is_viewable(window)?
            {
                continue;
            }
            members.push(WindowId(window));
        }
        Ok(members)
    }

    fn active_window(&self) -> Result<Option<WindowId>, Self::Error> {
        let active = self.first32(self.root, self.atoms._NET_ACTIVE_WINDOW, AtomEnum::WINDOW)?;
        Ok(active.filter(|&w| w != x11rb::NONE).map(WindowId))
    }

    fn current_group(&self) -> Result<GroupId, Self::Error> {
        let desktop = self.first32(self.root, self.atoms._NET_CURRENT_DESKTOP, AtomEnum::CARDINAL)?;
        Ok(GroupId(desktop.unwrap_or(0)))
    }

    fn group_count(&self) -> Result<Option<u32>, Self::Error> {
        self.first32(self.root, self.atoms._NET_NUMBER_OF_DESKTOPS, AtomEnum::CARDINAL)
    }

    fn screen_size(&self) -> Result<(u32, u32), Self::Error> {
        let geometry = self.conn.get_geometry(self.root)?.reply()?;
        Ok((u32::from(geometry.width), u32::from(geometry.height)))
    }

    fn set_geometry(&self, window: WindowId, rect: Rect) -> Result<(), Self::Error> {
        let aux = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(rect.width)
            .height(rect.height);
        self.conn.configure_window(window.0, &aux)?;
        Ok(())
    }

    fn unmaximize(&self, window: WindowId) -> Result<(), Self::Error> {
        let event = ClientMessageEvent::new(
            32,
            window.0,
            self.atoms._NET_WM_STATE,
            [
                NET_WM_STATE_REMOVE,
                self.atoms._NET_WM_STATE_MAXIMIZED_HORZ,
                self.atoms._NET_WM_STATE_MAXIMIZED_VERT,
                0,
                0,
            ],
        );
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        Ok(())
    }

    fn strip_decorations(&self, window: WindowId) -> Result<(), Self::Error> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window.0,
            self.atoms._MOTIF_WM_HINTS,
            self.atoms._MOTIF_WM_HINTS,
            &MOTIF_NO_DECORATIONS,
        )?;
        Ok(())
    }

    fn poll_changes(&self) -> Result<Vec<Change>, Self::Error> {
        let mut changes = Vec::new();
        while let Some(event) = self.conn.poll_for_event()? {
            if let Some(change) = classify(&event) {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    fn flush(&self) -> Result<(), Self::Error> {
        self.conn.flush()?;
        Ok(())
    }

    fn is_disconnected(error: &X11WmError) -> bool {
        matches!(
            error,
            X11WmError::Connection(_) | X11WmError::Reply(ReplyError::ConnectionError(_))
        )
    }
}
