/*
 *  projection.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Image-to-screen fit projection
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

use crate::constants::{CFG_CROP_DIR, CFG_CROP_ZOOM, CFG_FIT};
use crate::store::ConfigStore;

/// Column-major 4x4 matrix, as handed to GL
pub type Matrix4 = [f32; 16];

pub const IDENTITY: Matrix4 = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// How a background image is fitted to a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Whole image visible, letterboxed
    #[default]
    Full,
    /// Fill the screen, cropping the overflow
    Crop,
    /// Fill the screen, ignoring aspect
    Stretch,
}

impl FitMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(FitMode::Full),
            "crop" => Some(FitMode::Crop),
            "stretch" => Some(FitMode::Stretch),
            _ => None,
        }
    }

    /// Parse a config value, falling back to `Full` on anything unknown
    pub fn from_config(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!("invalid fit mode \"{}\", using full", s);
            FitMode::Full
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Full => "full",
            FitMode::Crop => "crop",
            FitMode::Stretch => "stretch",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fit settings for one screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub mode: FitMode,
    pub crop_zoom: f32,
    pub crop_dir: [f32; 2],
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            mode: FitMode::Full,
            crop_zoom: 1.0,
            crop_dir: [0.0, 0.0],
        }
    }
}

impl FitConfig {
    /// Read the current fit settings. They are host-global for now, so the
    /// screen index does not take part in the lookup.
    pub fn from_store(store: &ConfigStore) -> Self {
        let dir = store.vector(CFG_CROP_DIR, [0.0; 4]);
        let zoom = store.number(CFG_CROP_ZOOM, 1.0).max(0.0);
        Self {
            mode: FitMode::from_config(store.string(CFG_FIT, "full")),
            crop_zoom: zoom as f32,
            crop_dir: [dir[0] as f32, dir[1] as f32],
        }
    }
}

/// Projection that maps the unit image quad onto a screen.
///
/// Only the x/y scale entries (0 and 5) and the x/y translation entries
/// (12 and 13) ever differ from identity.
pub fn compute(
    screen_aspect: f32,
    image_aspect: f32,
    mode: FitMode,
    crop_zoom: f32,
    crop_dir: [f32; 2],
) -> Matrix4 {
    let mut xform = IDENTITY;
    if mode == FitMode::Stretch {
        return xform;
    }

    let wide = screen_aspect > image_aspect;
    let vpscale = if wide {
        xform[0] = image_aspect / screen_aspect;
        xform[0]
    } else {
        xform[5] = screen_aspect / image_aspect;
        xform[5]
    };

    if mode == FitMode::Crop {
        let crop_scale = 1.0 + (1.0 / vpscale - 1.0) * crop_zoom;
        let max_pan = crop_scale - 1.0;

        xform[0] *= crop_scale;
        xform[5] *= crop_scale;

        if wide {
            xform[13] = -crop_dir[1] * max_pan;
        } else {
            xform[12] = -crop_dir[0] * max_pan;
        }
    }

    xform
}
