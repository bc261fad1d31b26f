/*
 *  settings.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host-wide settings read from the config tree
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

use std::fmt;

use log::warn;

use crate::constants::*;
use crate::projection::FitConfig;
use crate::store::ConfigStore;

/// Background fill drawn behind the wallpaper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BgMode {
    #[default]
    Solid,
    VGrad,
    HGrad,
}

impl BgMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solid" => Some(BgMode::Solid),
            "vgrad" => Some(BgMode::VGrad),
            "hgrad" => Some(BgMode::HGrad),
            _ => None,
        }
    }

    pub fn from_config(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!("invalid background mode \"{}\", using solid", s);
            BgMode::Solid
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BgMode::Solid => "solid",
            BgMode::VGrad => "vgrad",
            BgMode::HGrad => "hgrad",
        }
    }
}

impl fmt::Display for BgMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the `xlivebg.*` globals
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostSettings {
    pub active: Option<String>,
    pub image: Option<String>,
    pub anim_mask: Option<String>,
    pub colors: [[f32; 4]; 2],
    pub bgmode: BgMode,
    /// None unless a positive fps is configured
    pub fps_override: Option<u32>,
    pub fit: FitConfig,
}

impl HostSettings {
    pub fn from_store(store: &ConfigStore) -> Self {
        let text = |path: &str| {
            let s = store.string(path, "");
            (!s.is_empty()).then(|| s.to_string())
        };
        let color = |path: &str| store.vector(path, [0.0; 4]).map(|c| c as f32);

        let fps = store.integer(CFG_FPS, -1);

        Self {
            active: text(CFG_ACTIVE),
            image: text(CFG_IMAGE),
            anim_mask: text(CFG_ANIM_MASK),
            colors: [color(CFG_COLOR), color(CFG_COLOR2)],
            bgmode: text(CFG_BGMODE)
                .map(|s| BgMode::from_config(&s))
                .unwrap_or_default(),
            fps_override: u32::try_from(fps).ok().filter(|&f| f > 0),
            fit: FitConfig::from_store(store),
        }
    }

    /// Frame interval forced by the fps override, if any, never shorter
    /// than `MIN_FRAME_INTERVAL_USEC`
    pub fn fps_interval_usec(&self) -> Option<u64> {
        self.fps_override
            .map(|fps| (1_000_000 / fps as u64).max(MIN_FRAME_INTERVAL_USEC))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::FitMode;
    use crate::store::ConfigValue;

    #[test]
    fn test_defaults_from_empty_store() {
        let s = HostSettings::from_store(&ConfigStore::new());
        assert_eq!(s.active, None);
        assert_eq!(s.bgmode, BgMode::Solid);
        assert_eq!(s.fps_override, None);
        assert_eq!(s.fit.mode, FitMode::Full);
        assert_eq!(s.fit.crop_zoom, 1.0);
        assert_eq!(s.colors, [[0.0; 4]; 2]);
    }

    #[test]
    fn test_values_from_store() {
        let mut store = ConfigStore::new();
        store.set(CFG_ACTIVE, "distort".into()).unwrap();
        store.set(CFG_IMAGE, "/usr/share/backgrounds/sky.jpg".into()).unwrap();
        store.set(CFG_BGMODE, "VGrad".into()).unwrap();
        store.set(CFG_COLOR, [0.1, 0.2, 0.3, 1.0].into()).unwrap();
        store.set(CFG_FPS, ConfigValue::Integer(25)).unwrap();

        let s = HostSettings::from_store(&store);
        assert_eq!(s.active.as_deref(), Some("distort"));
        assert_eq!(s.image.as_deref(), Some("/usr/share/backgrounds/sky.jpg"));
        assert_eq!(s.bgmode, BgMode::VGrad);
        assert_eq!(s.colors[0], [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(s.fps_interval_usec(), Some(40_000));
    }

    #[test]
    fn test_unknown_bgmode_falls_back() {
        let mut store = ConfigStore::new();
        store.set(CFG_BGMODE, "plaid".into()).unwrap();
        assert_eq!(HostSettings::from_store(&store).bgmode, BgMode::Solid);
    }

    #[test]
    fn test_non_positive_fps_is_no_override() {
        let mut store = ConfigStore::new();
        store.set(CFG_FPS, ConfigValue::Integer(0)).unwrap();
        assert_eq!(HostSettings::from_store(&store).fps_override, None);
        store.set(CFG_FPS, ConfigValue::Integer(-1)).unwrap();
        assert_eq!(HostSettings::from_store(&store).fps_interval_usec(), None);
    }

    #[test]
    fn test_huge_fps_is_clamped() {
        let mut store = ConfigStore::new();
        store.set(CFG_FPS, ConfigValue::Integer(2_000_000)).unwrap();
        assert_eq!(
            HostSettings::from_store(&store).fps_interval_usec(),
            Some(MIN_FRAME_INTERVAL_USEC)
        );
    }
}
