/*
 *  plugin/registry.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Ordered set of registered wallpaper plugins
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

use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;

use super::descriptor::PluginDescriptor;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot open plugin directory {0}: {1}")]
    DirectoryUnavailable(PathBuf, std::io::Error),

    #[error("failed to open plugin {0}: {1}")]
    ModuleLoadFailed(PathBuf, String),

    #[error("{0} is not an xlivebg plugin")]
    ModuleMissingEntryPoint(PathBuf),

    #[error("plugin \"{0}\" is already registered")]
    Duplicate(String),

    #[error("plugin index {0} out of range")]
    OutOfRange(usize),

    #[error("out of memory while registering plugin")]
    OutOfMemory,

    #[error("invalid plugin descriptor: {0}")]
    InvalidDescriptor(String),
}

/// Registered plugins in registration order, unique by case-insensitive name
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Append a plugin and return its index.
    ///
    /// The first registration of a name wins; later ones are rejected.
    pub fn register(&mut self, plugin: PluginDescriptor) -> Result<usize, RegistryError> {
        if plugin.name().is_empty() {
            return Err(RegistryError::InvalidDescriptor("empty plugin name".into()));
        }
        if self.position(plugin.name()).is_some() {
            warn!("plugin \"{}\" already registered, ignoring duplicate", plugin.name());
            return Err(RegistryError::Duplicate(plugin.name().to_string()));
        }

        if self.plugins.len() == self.plugins.capacity() {
            let grow = self.plugins.capacity().max(8);
            self.plugins
                .try_reserve(grow)
                .map_err(|_| RegistryError::OutOfMemory)?;
        }

        info!("registered plugin: {}", plugin.name());
        self.plugins.push(plugin);
        Ok(self.plugins.len() - 1)
    }

    pub fn by_index(&self, idx: usize) -> Option<&PluginDescriptor> {
        self.plugins.get(idx)
    }

    pub fn by_index_mut(&mut self, idx: usize) -> Option<&mut PluginDescriptor> {
        self.plugins.get_mut(idx)
    }

    pub fn by_name(&self, name: &str) -> Option<&PluginDescriptor> {
        self.position(name).map(|idx| &self.plugins[idx])
    }

    /// Index of the plugin with this name, compared case-insensitively
    pub fn position(&self, name: &str) -> Option<usize> {
        self.plugins
            .iter()
            .position(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter()
    }

    /// Unload a plugin and close the gap, keeping the order of the rest.
    ///
    /// This does not know about activation; `Host::remove_plugin` guards
    /// against pulling the active plugin out from under the controller.
    pub fn remove(&mut self, idx: usize) -> Result<(), RegistryError> {
        if idx >= self.plugins.len() {
            return Err(RegistryError::OutOfRange(idx));
        }
        let plugin = self.plugins.remove(idx);
        info!("removing plugin: {}", plugin.name());
        plugin.unload();
        Ok(())
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        while let Some(plugin) = self.plugins.pop() {
            plugin.unload();
        }
    }
}
