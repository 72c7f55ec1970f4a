use crate::parser::ParseOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub shell: ShellSettings,
    #[serde(default)]
    pub parse: ParseOptions,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Command lookup and prompt settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ShellSettings {
    /// Shell-private search path variable, consulted before `PATH`.
    #[serde(default)]
    pub path_var: String,
    /// Entries seeded into `path_var` when it is unset or empty.
    #[serde(default)]
    pub default_path: Vec<String>,
    #[serde(default)]
    pub command_suffix: String,
    /// Searched after `PATH`.
    #[serde(default)]
    pub extra_paths: Vec<String>,
    /// Extra location collapsed to `~` in the prompt. Empty means the canonical home.
    #[serde(default)]
    pub alt_home: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: String,
    /// Empty logs to stderr.
    #[serde(default)]
    pub file: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    shell: ShellOverlay,
    #[serde(default)]
    parse: ParseOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct ShellOverlay {
    #[serde(default)]
    replace: bool,
    path_var: Option<String>,
    #[serde(default)]
    default_path: Vec<String>,
    command_suffix: Option<String>,
    #[serde(default)]
    extra_paths: Vec<String>,
    alt_home: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ParseOverlay {
    expand_tilde: Option<bool>,
    expand_vars: Option<bool>,
    glob: Option<bool>,
    tilde_respects_quotes: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
    file: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode the user list replaces the default entirely, otherwise it extends it (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, replace: bool) {
    if replace {
        *base = add;
    } else {
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

fn set_if<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

/// Expand a leading `~` against `home`. Left untouched when `home` is empty.
pub fn expand_path(path: &str, home: &str) -> PathBuf {
    let expanded =
        shellexpand::tilde_with_context(path, || (!home.is_empty()).then(|| home.to_string()));
    PathBuf::from(expanded.into_owned())
}

impl ShellConfig {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `path`, or from ~/.config/tinsh/config.toml (if exists)
    ///
    /// An explicitly given file that cannot be read is an error. A file that does not
    /// parse is reported and ignored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?,
            ),
            None => Self::user_config_path().and_then(|p| std::fs::read_to_string(p).ok()),
        };
        if let Some(content) = content {
            match toml::from_str::<ConfigOverlay>(&content) {
                Ok(overlay) => config.apply_overlay(overlay),
                Err(e) => eprintln!("tinsh: config parse error: {e}"),
            }
        }
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/tinsh/config.toml"))
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.shell;
        set_if(&mut self.shell.path_var, s.path_var);
        set_if(&mut self.shell.command_suffix, s.command_suffix);
        set_if(&mut self.shell.alt_home, s.alt_home);
        merge_list(&mut self.shell.default_path, s.default_path, s.replace);
        merge_list(&mut self.shell.extra_paths, s.extra_paths, s.replace);

        let p = overlay.parse;
        set_if(&mut self.parse.expand_tilde, p.expand_tilde);
        set_if(&mut self.parse.expand_vars, p.expand_vars);
        set_if(&mut self.parse.glob, p.glob);
        set_if(&mut self.parse.tilde_respects_quotes, p.tilde_respects_quotes);

        let l = overlay.logging;
        set_if(&mut self.logging.level, l.level);
        set_if(&mut self.logging.file, l.file);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).expect("test overlay must parse");
        self.apply_overlay(overlay);
    }
}

impl ShellSettings {
    /// `default_path` with `~` expanded.
    pub fn default_path_dirs(&self, home: &str) -> Vec<PathBuf> {
        self.default_path.iter().map(|p| expand_path(p, home)).collect()
    }

    /// `extra_paths` with `~` expanded.
    pub fn extra_path_dirs(&self, home: &str) -> Vec<PathBuf> {
        self.extra_paths.iter().map(|p| expand_path(p, home)).collect()
    }

    /// The second directory shown as `~` in the prompt, if any.
    ///
    /// The configured `alt_home` wins; otherwise the canonical form of `home` when it
    /// differs from `home` itself (e.g. a symlinked home directory).
    pub fn alt_home(&self, home: &str) -> Option<PathBuf> {
        if !self.alt_home.is_empty() {
            return Some(expand_path(&self.alt_home, home));
        }
        if home.is_empty() {
            return None;
        }
        let canonical = std::fs::canonicalize(home).ok()?;
        (canonical != Path::new(home)).then_some(canonical)
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
