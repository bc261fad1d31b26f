/*
 *  config.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Command line options and config file discovery
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use log::{error, info};

use crate::constants::{CFG_ACTIVE, CFG_FIT, CFG_FPS};
use crate::projection::FitMode;
use crate::screen::ScreenDescriptor;
use crate::store::{ConfigError, ConfigStore, ConfigValue};

/// CLI overrides. Settings given here win over the config file.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "xlivebg", about = "Live wallpapers for the X window system", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// enable debug logging
    #[arg(long, short = 'd', action = ArgAction::SetTrue)]
    pub debug: bool,
    /// log filter, e.g. "info" or "xlivebg=trace"
    #[arg(long)]
    pub log_level: Option<String>,
    /// extra directory to search for plugins first
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub plugin_dir: Option<PathBuf>,
    /// control socket path
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub socket: Option<PathBuf>,
    /// screen geometry, repeat for multiple screens
    #[arg(long = "screen", value_name = "WxH[+X+Y]")]
    pub screens: Vec<ScreenDescriptor>,
    /// live wallpaper to start with
    #[arg(long, short = 'a')]
    pub active: Option<String>,
    /// force a frame rate, 0 or less to follow the plugin
    #[arg(long)]
    pub fps: Option<i64>,
    /// image fit mode: full, crop or stretch
    #[arg(long, value_parser = parse_fit)]
    pub fit: Option<FitMode>,
    /// list available plugins and exit
    #[arg(long, short = 'l', action = ArgAction::SetTrue)]
    pub list: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

fn parse_fit(s: &str) -> Result<FitMode, String> {
    FitMode::parse(s).ok_or_else(|| format!("invalid fit mode \"{}\" (full|crop|stretch)", s))
}

impl Cli {
    /// Default log filter, before `RUST_LOG` is consulted
    pub fn log_filter(&self) -> &str {
        match &self.log_level {
            Some(level) => level.as_str(),
            None if self.debug => "debug",
            None => "info",
        }
    }
}

/// Try common locations in order (first hit wins).
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/xlivebg/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".xlivebg/config.yaml");
        if p.exists() { return Some(p) }
    }
    let p = PathBuf::from("/etc/xlivebg.yaml");
    if p.exists() { return Some(p) }
    None
}

/// Load the config tree: explicit path, else search, else empty.
///
/// A file that does not parse, or is not an xlivebg config, is logged and
/// replaced by an empty tree. A missing explicit path is an error.
pub fn load_store(cli: &Cli) -> Result<ConfigStore, ConfigError> {
    let path = match cli.config.as_ref() {
        Some(p) if !p.exists() => {
            return Err(ConfigError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Config file not found: {}", p.display()),
            )));
        }
        Some(p) => Some(p.clone()),
        None => find_config_file(),
    };

    let Some(path) = path else {
        info!("no config file found, using defaults");
        return Ok(ConfigStore::new());
    };
    load_or_default(&path)
}

fn load_or_default(path: &Path) -> Result<ConfigStore, ConfigError> {
    let mut store = ConfigStore::new();
    match store.load_file(path) {
        Ok(()) => Ok(store),
        Err(e @ (ConfigError::Parse(_) | ConfigError::Schema(_))) => {
            error!("failed to load config file {}: {}", path.display(), e);
            Ok(ConfigStore::new())
        }
        Err(e) => Err(e),
    }
}

/// Write CLI overrides into the tree (highest precedence)
pub fn apply_cli_overrides(store: &mut ConfigStore, cli: &Cli) -> Result<(), ConfigError> {
    if let Some(active) = &cli.active {
        store.set(CFG_ACTIVE, ConfigValue::String(active.clone()))?;
    }
    if let Some(fps) = cli.fps {
        store.set(CFG_FPS, ConfigValue::Integer(fps))?;
    }
    if let Some(fit) = cli.fit {
        store.set(CFG_FIT, fit.as_str().into())?;
    }
    Ok(())
}

/// Pretty YAML of the effective config (nice for debugging)
pub fn dump_config(store: &ConfigStore) -> Result<String, ConfigError> {
    let bytes = store.serialize()?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "xlivebg", "--screen", "1920x1080", "--screen", "1280x1024+1920+0",
            "--fit", "Crop", "--fps", "30", "-a", "distort",
        ])
        .unwrap();
        assert_eq!(cli.screens.len(), 2);
        assert_eq!(cli.screens[1].viewport, [1920, 0, 1280, 1024]);
        assert_eq!(cli.fit, Some(FitMode::Crop));
        assert_eq!(cli.fps, Some(30));
        assert_eq!(cli.active.as_deref(), Some("distort"));
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["xlivebg", "--fit", "tile"]).is_err());
        assert!(Cli::try_parse_from(["xlivebg", "--screen", "big"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        let cli = Cli { debug: true, ..Cli::default() };
        assert_eq!(cli.log_filter(), "debug");
        let cli = Cli { debug: true, log_level: Some("warn".into()), ..Cli::default() };
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn test_overrides_written_to_store() {
        let cli = Cli {
            active: Some("stars".into()),
            fps: Some(24),
            fit: Some(FitMode::Stretch),
            ..Cli::default()
        };
        let mut store = ConfigStore::new();
        apply_cli_overrides(&mut store, &cli).unwrap();
        assert_eq!(store.string(CFG_ACTIVE, ""), "stars");
        assert_eq!(store.integer(CFG_FPS, 0), 24);
        assert_eq!(store.string(CFG_FIT, ""), "stretch");
    }

    #[test]
    fn test_broken_file_falls_back_to_empty() {
        let dir = std::env::temp_dir().join(format!("xlivebg-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let wrong_root = dir.join("wrong.yaml");
        fs::write(&wrong_root, "wallpaper:\n  fps: 30\n").unwrap();
        let store = load_or_default(&wrong_root).unwrap();
        assert_eq!(store.attribute_count(), 0);
        assert!(store.origin().is_none());

        let good = dir.join("good.yaml");
        fs::write(&good, "xlivebg:\n  fps: 30\n").unwrap();
        let cli = Cli { config: Some(good.clone()), ..Cli::default() };
        let store = load_store(&cli).unwrap();
        assert_eq!(store.integer(CFG_FPS, 0), 30);
        assert_eq!(store.origin(), Some(good.as_path()));

        let cli = Cli { config: Some(dir.join("missing.yaml")), ..Cli::default() };
        assert!(load_store(&cli).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_dump_config() {
        let mut store = ConfigStore::new();
        store.set("xlivebg.distort.amplitude", ConfigValue::Number(0.05)).unwrap();
        let text = dump_config(&store).unwrap();
        assert!(text.starts_with("xlivebg:"));
        assert!(text.contains("amplitude: 0.05"));
    }
}
