//! Command-line interface.
//!
//! Flags are layered over the JSON config file: anything given on the
//! command line wins.

use crate::command::Command;
use crate::config::{parse_group_list, parse_group_override, Config, ConfigError};
use crate::grid::LayoutSpec;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gridtile")]
#[command(about = "Arrange the windows of a desktop into a grid")]
#[command(version)]
pub struct Cli {
    /// Keep running, re-tiling on window changes and accepting reorder
    /// commands
    #[arg(long)]
    pub daemon: bool,

    /// Comma-separated list of desktops to tile
    #[arg(long, value_name = "1,2,3")]
    pub tile_desktops: Option<String>,

    /// Default horizontal margin applied to both sides
    #[arg(long, value_name = "PX")]
    pub margin_x: Option<u32>,

    /// Default left margin
    #[arg(long, value_name = "PX")]
    pub margin_left: Option<u32>,

    /// Default right margin
    #[arg(long, value_name = "PX")]
    pub margin_right: Option<u32>,

    /// Default top margin
    #[arg(long, value_name = "PX")]
    pub margin_top: Option<u32>,

    /// Default bottom margin
    #[arg(long, value_name = "PX")]
    pub margin_bottom: Option<u32>,

    /// Default gap between windows
    #[arg(long, value_name = "PX")]
    pub gap: Option<u32>,

    /// Per-desktop override (repeatable)
    #[arg(long, value_name = "N:top,right,bottom,left,gap")]
    pub desktop_config: Vec<String>,

    /// Default layout for tiled desktops
    #[arg(long, value_name = "top,right,bottom,left,gap")]
    pub desktop_default_config: Option<String>,

    /// Path of the command socket
    #[arg(long, value_name = "PATH")]
    pub command_socket: Option<PathBuf>,

    /// Quiet period after the last window change before re-tiling
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Path to the JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ask a running daemon to move the active window left
    #[arg(long, conflicts_with_all = ["daemon", "move_right"])]
    pub move_left: bool,

    /// Ask a running daemon to move the active window right
    #[arg(long, conflicts_with = "daemon")]
    pub move_right: bool,
}

impl Cli {
    /// The reorder command to send, if this is a client invocation.
    pub fn command(&self) -> Option<Command> {
        if self.move_left {
            Some(Command::ReorderLeft)
        } else if self.move_right {
            Some(Command::ReorderRight)
        } else {
            None
        }
    }

    /// Overlay the flags onto `config`.
    pub fn apply(&self, config: &mut Config) -> Result<(), ConfigError> {
        apply_margins(&mut config.layout, self);

        if let Some(list) = &self.tile_desktops {
            config.tiled_groups = parse_group_list(list);
        }
        if let Some(spec) = &self.desktop_default_config {
            config.tiled_layout = Some(spec.parse()?);
        }
        for entry in &self.desktop_config {
            let (group, layout) = parse_group_override(entry)?;
            config.groups.insert(group, layout);
        }
        if let Some(path) = &self.command_socket {
            config.socket = Some(path.clone());
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce_ms = ms;
        }
        Ok(())
    }
}

fn apply_margins(layout: &mut LayoutSpec, cli: &Cli) {
    if let Some(px) = cli.margin_x {
        layout.left = px;
        layout.right = px;
    }
    if let Some(px) = cli.margin_left {
        layout.left = px;
    }
    if let Some(px) = cli.margin_right {
        layout.right = px;
    }
    if let Some(px) = cli.margin_top {
        layout.top = px;
    }
    if let Some(px) = cli.margin_bottom {
        layout.bottom = px;
    }
    if let Some(px) = cli.gap {
        layout.gap = px;
    }
}
