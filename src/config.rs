//! Configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--sort`, `--depth`, `--all`, etc.)
//! 2. Explicit `--config <file>`
//! 3. `$FLM_CONFIG` environment variable (path to config file)
//! 4. Project-local `.flm.toml` in the current working directory
//! 5. Global `~/.config/flm/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::watcher::{DEFAULT_DEBOUNCE_MS, DEFAULT_IGNORE_PATTERNS};
use crate::model::{SortColumn, SortOrder, SortSettings};

// ── Section configs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Show hidden files.
    pub show_hidden: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SortConfig {
    /// "name", "size", "type" or "modified".
    pub column: Option<String>,
    /// "ascending" or "descending".
    pub order: Option<String>,
    /// Directories always listed first.
    pub directories_first: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// How many directory levels to expand below the top level.
    pub expand_depth: Option<usize>,
    /// Whether directories show an expander.
    pub has_child: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable filesystem watcher for auto-refresh.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Path components whose changes are ignored.
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter; `RUST_LOG` wins.
    pub level: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub sort: SortConfig,
    pub tree: TreeConfig,
    pub watcher: WatcherConfig,
    pub logging: LoggingConfig,
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Candidate config file paths in priority order, excluding `--config`.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("FLM_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".flm.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("flm").join("config.toml"));
    }

    paths
}

/// Read and parse a TOML config file. Returns `None` if the file doesn't
/// exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
            },
            sort: SortConfig {
                column: other.sort.column.clone().or(self.sort.column),
                order: other.sort.order.clone().or(self.sort.order),
                directories_first: other
                    .sort
                    .directories_first
                    .or(self.sort.directories_first),
            },
            tree: TreeConfig {
                expand_depth: other.tree.expand_depth.or(self.tree.expand_depth),
                has_child: other.tree.has_child.or(self.tree.has_child),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
                ignore: other.watcher.ignore.clone().or(self.watcher.ignore),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Lowest priority first so higher ones overwrite.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn default_path(&self) -> Option<&str> {
        self.general.default_path.as_deref()
    }

    /// Comparator settings. Unknown column or order names fall back to the
    /// defaults with a warning.
    pub fn sort_settings(&self) -> SortSettings {
        let defaults = SortSettings::default();
        let column = match self.sort.column.as_deref() {
            None => defaults.column,
            Some(name) => SortColumn::from_name(name).unwrap_or_else(|| {
                log::warn!("unknown sort column {:?}, using name", name);
                defaults.column
            }),
        };
        let order = match self.sort.order.as_deref() {
            None => defaults.order,
            Some(name) => SortOrder::from_name(name).unwrap_or_else(|| {
                log::warn!("unknown sort order {:?}, using ascending", name);
                defaults.order
            }),
        };
        SortSettings {
            column,
            order,
            directories_first: self
                .sort
                .directories_first
                .unwrap_or(defaults.directories_first),
        }
    }

    pub fn expand_depth(&self) -> usize {
        self.tree.expand_depth.unwrap_or(0)
    }

    pub fn has_child(&self) -> bool {
        self.tree.has_child.unwrap_or(true)
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    pub fn debounce_ms(&self) -> u64 {
        self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn ignore_patterns(&self) -> Vec<String> {
        match &self.watcher.ignore {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("warn")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert_eq!(cfg.default_path(), None);
        assert_eq!(cfg.sort_settings(), SortSettings::default());
        assert_eq!(cfg.expand_depth(), 0);
        assert!(cfg.has_child());
        assert!(cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), 300);
        assert!(cfg.ignore_patterns().contains(&".git".to_string()));
        assert_eq!(cfg.log_level(), "warn");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
show_hidden = true
default_path = "/srv"

[sort]
column = "size"
order = "descending"
directories_first = false

[tree]
expand_depth = 2
has_child = false

[watcher]
enabled = false
debounce_ms = 500
ignore = ["build"]

[logging]
level = "debug"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert_eq!(cfg.default_path(), Some("/srv"));
        assert_eq!(
            cfg.sort_settings(),
            SortSettings {
                column: SortColumn::Size,
                order: SortOrder::Descending,
                directories_first: false,
            }
        );
        assert_eq!(cfg.expand_depth(), 2);
        assert!(!cfg.has_child());
        assert!(!cfg.watcher_enabled());
        assert_eq!(cfg.debounce_ms(), 500);
        assert_eq!(cfg.ignore_patterns(), vec!["build".to_string()]);
        assert_eq!(cfg.log_level(), "debug");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[sort]
order = "desc"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        let sort = cfg.sort_settings();
        assert_eq!(sort.order, SortOrder::Descending);
        assert_eq!(sort.column, SortColumn::Name);
        assert!(sort.directories_first);
        assert!(!cfg.show_hidden());
    }

    #[test]
    fn test_unknown_sort_names_fall_back() {
        let toml = r#"
[sort]
column = "colour"
order = "sideways"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.sort_settings(), SortSettings::default());
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(false),
                default_path: Some("/base".into()),
            },
            tree: TreeConfig {
                expand_depth: Some(1),
                has_child: Some(false),
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                expand_depth: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert_eq!(merged.default_path(), Some("/base"));
        assert_eq!(merged.expand_depth(), 3);
        assert!(!merged.has_child());
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            watcher: WatcherConfig {
                enabled: Some(false),
                debounce_ms: Some(500),
                ignore: None,
            },
            ..Default::default()
        };

        let merged = base.merge(&AppConfig::default());
        assert!(!merged.watcher_enabled());
        assert_eq!(merged.debounce_ms(), 500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[sort]
column = "modified"

[tree]
expand_depth = 1
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.sort_settings().column, SortColumn::Modified);
        assert_eq!(cfg.expand_depth(), 1);
        assert!(cfg.has_child());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
show_hidden = true

[tree]
expand_depth = 1
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            tree: TreeConfig {
                expand_depth: Some(4),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.expand_depth(), 4);
        assert!(cfg.show_hidden());
    }
}
