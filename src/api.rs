/*
 *  api.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Services the host offers to running plugins
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

use crate::projection::{self, FitConfig, FitMode, Matrix4};
use crate::screen::{ImageInfo, ScreenDescriptor};
use crate::store::{ConfigError, ConfigStore, ConfigValue, MAX_VECTOR_LEN};

/// What the window system and image loader know: screens, uploaded images
/// and the pointer. The embedder fills this in; the core only reads it.
#[derive(Debug, Clone)]
pub struct HostEnv {
    screens: Vec<ScreenDescriptor>,
    bg_images: Vec<Option<ImageInfo>>,
    anim_masks: Vec<Option<ImageInfo>>,
    mouse: (i32, i32),
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl HostEnv {
    /// An empty screen list is replaced by a single default screen
    pub fn new(mut screens: Vec<ScreenDescriptor>) -> Self {
        if screens.is_empty() {
            screens.push(ScreenDescriptor::default());
        }
        let n = screens.len();
        Self {
            screens,
            bg_images: vec![None; n],
            anim_masks: vec![None; n],
            mouse: (0, 0),
        }
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn screen(&self, idx: usize) -> Option<&ScreenDescriptor> {
        self.screens.get(idx)
    }

    pub fn screens(&self) -> &[ScreenDescriptor] {
        &self.screens
    }

    pub fn bg_image(&self, scr: usize) -> Option<ImageInfo> {
        self.bg_images.get(scr).copied().flatten()
    }

    pub fn anim_mask(&self, scr: usize) -> Option<ImageInfo> {
        self.anim_masks.get(scr).copied().flatten()
    }

    /// Set the background image of every screen
    pub fn set_bg_image(&mut self, image: Option<ImageInfo>) {
        self.bg_images.iter_mut().for_each(|slot| *slot = image);
    }

    pub fn set_screen_bg_image(&mut self, scr: usize, image: Option<ImageInfo>) {
        if let Some(slot) = self.bg_images.get_mut(scr) {
            *slot = image;
        }
    }

    pub fn set_anim_mask(&mut self, image: Option<ImageInfo>) {
        self.anim_masks.iter_mut().for_each(|slot| *slot = image);
    }

    pub fn mouse_pos(&self) -> (i32, i32) {
        self.mouse
    }

    pub fn set_mouse_pos(&mut self, x: i32, y: i32) {
        self.mouse = (x, y);
    }

    pub fn viewport(&self, scr: usize) -> Option<[i32; 4]> {
        self.screen(scr).map(|s| s.viewport)
    }

    /// Fit projection for an image on screen `scr`. Fit settings are read
    /// from the store on every call, so changes apply on the next frame.
    pub fn image_projection(&self, config: &ConfigStore, scr: usize, image_aspect: f32) -> Matrix4 {
        let screen_aspect = self.screen(scr).map_or(1.0, ScreenDescriptor::aspect);
        let fit = FitConfig::from_store(config);
        projection::compute(screen_aspect, image_aspect, fit.mode, fit.crop_zoom, fit.crop_dir)
    }
}

/// The view of the host a plugin hook gets for the duration of one call.
///
/// Config writes land in the store right away. Change notifications for
/// them are delivered after the hook returns.
pub struct HostApi<'a> {
    config: &'a mut ConfigStore,
    env: &'a HostEnv,
}

impl<'a> HostApi<'a> {
    pub fn new(config: &'a mut ConfigStore, env: &'a HostEnv) -> Self {
        Self { config, env }
    }

    pub fn screen_count(&self) -> usize {
        self.env.screen_count()
    }

    pub fn screen(&self, idx: usize) -> Option<&ScreenDescriptor> {
        self.env.screen(idx)
    }

    pub fn bg_image(&self, scr: usize) -> Option<ImageInfo> {
        self.env.bg_image(scr)
    }

    pub fn anim_mask(&self, scr: usize) -> Option<ImageInfo> {
        self.env.anim_mask(scr)
    }

    pub fn fit(&self, _scr: usize) -> FitConfig {
        FitConfig::from_store(self.config)
    }

    pub fn fit_mode(&self, scr: usize) -> FitMode {
        self.fit(scr).mode
    }

    pub fn crop_zoom(&self, scr: usize) -> f32 {
        self.fit(scr).crop_zoom
    }

    pub fn crop_dir(&self, scr: usize) -> [f32; 2] {
        self.fit(scr).crop_dir
    }

    pub fn image_projection(&self, scr: usize, image_aspect: f32) -> Matrix4 {
        self.env.image_projection(self.config, scr, image_aspect)
    }

    pub fn viewport(&self, scr: usize) -> Option<[i32; 4]> {
        self.env.viewport(scr)
    }

    pub fn mouse_pos(&self) -> (i32, i32) {
        self.env.mouse_pos()
    }

    pub fn has(&self, path: &str) -> bool {
        self.config.contains(path)
    }

    pub fn get(&self, path: &str) -> Option<ConfigValue> {
        self.config.lookup(path)
    }

    pub fn string<'s>(&'s self, path: &str, default: &'s str) -> &'s str {
        self.config.string(path, default)
    }

    pub fn number(&self, path: &str, default: f64) -> f64 {
        self.config.number(path, default)
    }

    pub fn integer(&self, path: &str, default: i64) -> i64 {
        self.config.integer(path, default)
    }

    pub fn vector(&self, path: &str, default: [f64; MAX_VECTOR_LEN]) -> [f64; MAX_VECTOR_LEN] {
        self.config.vector(path, default)
    }

    pub fn set(&mut self, path: &str, value: ConfigValue) -> Result<(), ConfigError> {
        self.config.set(path, value)
    }

    /// Write `value` unless the attribute already exists
    pub fn set_default(&mut self, path: &str, value: ConfigValue) -> Result<bool, ConfigError> {
        self.config.set_default(path, value)
    }

    pub fn config(&self) -> &ConfigStore {
        self.config
    }
}
