//! Application configuration.
//!
//! Settings come from an optional JSON file, overridden by command-line
//! flags.  Every key is optional; a minimal `{}` file is valid.
//!
//! # Example
//!
//! ```json
//! {
//!   "layout": { "top": 0, "right": 0, "bottom": 0, "left": 0, "gap": 0 },
//!   "tiled_layout": "32,8,8,8,8",
//!   "groups": { "3": "0,0,0,0,0" },
//!   "tiled_groups": [1, 2, 3],
//!   "debounce_ms": 200,
//!   "socket": "/run/user/1000/gridtile.sock"
//! }
//! ```
//!
//! Layouts may be written either as an object or as a
//! `"top,right,bottom,left,gap"` string.

use crate::command::GroupId;
use crate::debounce::DEFAULT_INTERVAL;
use crate::grid::{LayoutSpec, LayoutSpecError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout used when nothing more specific applies.
    pub layout: LayoutSpec,

    /// Layout for every tiled group without its own entry in
    /// [`groups`](Config::groups).  Takes precedence over
    /// [`layout`](Config::layout).
    pub tiled_layout: Option<LayoutSpec>,

    /// Per-group layout overrides.
    pub groups: BTreeMap<GroupId, LayoutSpec>,

    /// Groups the daemon arranges.  Empty means "decide at startup" (see
    /// [`Config::resolve_tiled_groups`]).
    pub tiled_groups: BTreeSet<GroupId>,

    /// Quiet period after the last change before re-arranging (ms).
    pub debounce_ms: u64,

    /// Command socket path.  `None` uses [`default_socket_path`].
    pub socket: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutSpec::ZERO,
            tiled_layout: None,
            groups: BTreeMap::new(),
            tiled_groups: BTreeSet::new(),
            debounce_ms: DEFAULT_INTERVAL.as_millis() as u64,
            socket: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// The layout for `group`: its own override, else the tiled default,
    /// else the global default.
    pub fn layout_for(&self, group: GroupId) -> LayoutSpec {
        self.groups
            .get(&group)
            .copied()
            .or(self.tiled_layout)
            .unwrap_or(self.layout)
    }

    /// Whether `group` is arranged by the daemon.  An empty tiled set tiles
    /// every group.
    pub fn should_tile(&self, group: GroupId) -> bool {
        self.tiled_groups.is_empty() || self.tiled_groups.contains(&group)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(default_socket_path)
    }

    /// Fill an empty tiled set from the window manager's group count.
    ///
    /// With more than one group, group 0 is left to the window manager and
    /// every other group is tiled.  With one group (or an unknown count),
    /// group 0 is tiled.
    pub fn resolve_tiled_groups(&mut self, group_count: Option<u32>) {
        if self.tiled_groups.is_empty() {
            self.tiled_groups = default_tiled_groups(group_count);
        }
    }
}

/// The tiled set used when none is configured.
pub fn default_tiled_groups(group_count: Option<u32>) -> BTreeSet<GroupId> {
    match group_count {
        Some(n) if n > 1 => (1..n).map(GroupId).collect(),
        _ => BTreeSet::from([GroupId(0)]),
    }
}

/// Default socket path for the command listener.
pub fn default_socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("gridtile.sock")
}

/// Resolve the config file path (`$XDG_CONFIG_HOME/gridtile/config.json`).
pub fn default_config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("gridtile").join("config.json")
}

/// Parse a per-group override of the form `N:top,right,bottom,left,gap`.
pub fn parse_group_override(value: &str) -> Result<(GroupId, LayoutSpec), ConfigError> {
    let (group, layout) = value
        .split_once(':')
        .ok_or_else(|| ConfigError::GroupOverride(value.to_string()))?;
    let group = group
        .parse()
        .map_err(|_| ConfigError::GroupOverride(value.to_string()))?;
    Ok((group, layout.parse()?))
}

/// Parse a comma-separated list of group numbers.  Entries that are not
/// numbers are skipped with a warning.
pub fn parse_group_list(value: &str) -> BTreeSet<GroupId> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| match s.parse() {
            Ok(g) => Some(g),
            Err(_) => {
                warn!("ignoring invalid desktop number: {:?}", s);
                None
            }
        })
        .collect()
}

/// Error from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {0}")]
    Read(String),
    #[error("failed to parse config {0}")]
    Parse(String),
    #[error(transparent)]
    Layout(#[from] LayoutSpecError),
    #[error("per-desktop layout must look like N:top,right,bottom,left,gap (got {0:?})")]
    GroupOverride(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "layout": { "top": 1, "right": 2, "bottom": 3, "left": 4, "gap": 5 },
            "tiled_layout": "8,8,8,8,8",
            "groups": { "3": "0,0,0,0,2", "4": { "gap": 10 } },
            "tiled_groups": [1, 3, 4],
            "debounce_ms": 120,
            "socket": "/tmp/custom.sock"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.layout, "1,2,3,4,5".parse().unwrap());
        assert_eq!(cfg.tiled_layout, Some(LayoutSpec::uniform(8)));
        assert_eq!(cfg.groups[&GroupId(3)].gap, 2);
        assert_eq!(cfg.groups[&GroupId(4)].gap, 10);
        assert_eq!(
            cfg.tiled_groups,
            BTreeSet::from([GroupId(1), GroupId(3), GroupId(4)])
        );
        assert_eq!(cfg.debounce(), Duration::from_millis(120));
        assert_eq!(cfg.socket_path(), PathBuf::from("/tmp/custom.sock"));
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.debounce(), DEFAULT_INTERVAL);
        assert_eq!(cfg.layout, LayoutSpec::ZERO);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "debounce_ms": 10, "future_section": { "key": 42 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.debounce_ms, 10);
    }

    #[test]
    fn malformed_layout_is_rejected() {
        let json = r#"{ "tiled_layout": "1,2,3" }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn layout_resolution_order() {
        let mut cfg = Config {
            layout: LayoutSpec::uniform(1),
            ..Config::default()
        };
        assert_eq!(cfg.layout_for(GroupId(2)), LayoutSpec::uniform(1));

        cfg.tiled_layout = Some(LayoutSpec::uniform(2));
        assert_eq!(cfg.layout_for(GroupId(2)), LayoutSpec::uniform(2));

        cfg.groups.insert(GroupId(2), LayoutSpec::uniform(3));
        assert_eq!(cfg.layout_for(GroupId(2)), LayoutSpec::uniform(3));
        assert_eq!(cfg.layout_for(GroupId(5)), LayoutSpec::uniform(2));
    }

    #[test]
    fn should_tile_respects_set() {
        let mut cfg = Config::default();
        assert!(cfg.should_tile(GroupId(0)));
        assert!(cfg.should_tile(GroupId(7)));
        cfg.tiled_groups = BTreeSet::from([GroupId(1)]);
        assert!(cfg.should_tile(GroupId(1)));
        assert!(!cfg.should_tile(GroupId(0)));
    }

    #[test]
    fn default_tiled_groups_policy() {
        assert_eq!(default_tiled_groups(None), BTreeSet::from([GroupId(0)]));
        assert_eq!(default_tiled_groups(Some(0)), BTreeSet::from([GroupId(0)]));
        assert_eq!(default_tiled_groups(Some(1)), BTreeSet::from([GroupId(0)]));
        assert_eq!(
            default_tiled_groups(Some(4)),
            BTreeSet::from([GroupId(1), GroupId(2), GroupId(3)])
        );
    }

    #[test]
    fn resolve_keeps_explicit_set() {
        let mut cfg = Config {
            tiled_groups: BTreeSet::from([GroupId(0)]),
            ..Config::default()
        };
        cfg.resolve_tiled_groups(Some(4));
        assert_eq!(cfg.tiled_groups, BTreeSet::from([GroupId(0)]));

        let mut cfg = Config::default();
        cfg.resolve_tiled_groups(Some(3));
        assert_eq!(cfg.tiled_groups, BTreeSet::from([GroupId(1), GroupId(2)]));
    }

    #[test]
    fn group_override_parsing() {
        let (g, l) = parse_group_override("2:10,0,0,0,4").unwrap();
        assert_eq!(g, GroupId(2));
        assert_eq!(l.top, 10);
        assert_eq!(l.gap, 4);
        assert!(matches!(
            parse_group_override("10,0,0,0,4"),
            Err(ConfigError::GroupOverride(_))
        ));
        assert!(matches!(
            parse_group_override("x:10,0,0,0,4"),
            Err(ConfigError::GroupOverride(_))
        ));
        assert!(matches!(
            parse_group_override("2:10,0,0,0"),
            Err(ConfigError::Layout(_))
        ));
    }

    #[test]
    fn group_list_skips_garbage() {
        assert_eq!(
            parse_group_list("1,2,,x,4"),
            BTreeSet::from([GroupId(1), GroupId(2), GroupId(4)])
        );
        assert!(parse_group_list("").is_empty());
    }
}
