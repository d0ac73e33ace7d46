//! Entry point for **gridtile**.
//!
//! Three modes:
//!
//! * `--move-left` / `--move-right` send a reorder command to a running
//!   daemon and exit.
//! * `--daemon` arranges the current desktop, then keeps it arranged until
//!   SIGINT or SIGTERM.
//! * Otherwise the current desktop is arranged once.

use clap::Parser;
use gridtile::arranger::Arranger;
use gridtile::cancel::CancelToken;
use gridtile::cli::Cli;
use gridtile::config::{default_config_path, Config};
use gridtile::daemon;
use gridtile::ipc::client::send_command;
use gridtile::traits::WindowManager;
use gridtile::x11::wm::X11Wm;
use log::{error, info, warn};
use std::path::Path;

/// Load the config file, falling back to compiled-in defaults when it does
/// not exist.  A file that exists but cannot be parsed is fatal.
fn load_config(path: &Path) -> Config {
    if !path.exists() {
        info!("no config file at {}, using defaults", path.display());
        return Config::default();
    }
    match Config::load(path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    if let Err(e) = cli.apply(&mut config) {
        error!("{}", e);
        std::process::exit(1);
    }

    if let Some(cmd) = cli.command() {
        if let Err(e) = send_command(config.socket_path(), cmd) {
            error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    let wm = match X11Wm::connect() {
        Ok(wm) => wm,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    match wm.group_count() {
        Ok(count) => config.resolve_tiled_groups(count),
        Err(e) => {
            warn!("failed to read desktop count: {}", e);
            config.resolve_tiled_groups(None);
        }
    }

    if cli.daemon {
        run_daemon(wm, config);
    } else {
        let mut arranger = Arranger::new(wm, config);
        if let Err(e) = arranger.apply_current() {
            error!("arrangement failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_daemon(wm: X11Wm, config: Config) {
    if let Err(e) = wm.subscribe() {
        error!("failed to subscribe to window events: {}", e);
        std::process::exit(1);
    }

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!("failed to install signal handler: {}", e);
        }
    }

    let tiled: Vec<String> = config.tiled_groups.iter().map(|g| g.to_string()).collect();
    info!(
        "gridtile running; tiling desktop(s) {} via {}",
        tiled.join(","),
        config.socket_path().display()
    );

    let mut arranger = Arranger::new(wm, config);
    daemon::run(&mut arranger, &cancel, daemon::TICK);
}
