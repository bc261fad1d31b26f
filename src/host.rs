/*
 *  host.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host context tying config, plugins and activation together
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

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::activation::{ActivationController, ActivationError};
use crate::api::{HostApi, HostEnv};
use crate::constants::{CFG_ACTIVE, DEFAULT_FRAME_INTERVAL_USEC, MIN_FRAME_INTERVAL_USEC};
use crate::plugin::{
    register_entry, Hook, PluginDescriptor, PluginEntryFn, PluginLoader, PluginRegistry,
    RegistryError,
};
use crate::projection::Matrix4;
use crate::render::RenderBackend;
use crate::settings::HostSettings;
use crate::notify::ChangeNotifier;
use crate::store::{ConfigError, ConfigStore, ConfigValue};

/// Plugin hooks that keep writing settings in reaction to their own
/// notifications are cut off after this many rounds
const MAX_DISPATCH_ROUNDS: usize = 16;

/// Everything the running host owns.
///
/// All plugin hooks run from methods on this type, one at a time. Config
/// writes made by hooks are queued in the store and delivered once the hook
/// has returned.
#[derive(Debug)]
pub struct Host {
    config: ConfigStore,
    activation: ActivationController,
    notifier: ChangeNotifier,
    registry: PluginRegistry,
    env: HostEnv,
    epoch: Instant,
}

impl Host {
    pub fn new(config: ConfigStore, env: HostEnv, backend: Box<dyn RenderBackend>) -> Self {
        Self {
            config,
            activation: ActivationController::new(backend),
            notifier: ChangeNotifier::new(),
            registry: PluginRegistry::new(),
            env,
            epoch: Instant::now(),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut HostEnv {
        &mut self.env
    }

    pub fn settings(&self) -> HostSettings {
        HostSettings::from_store(&self.config)
    }

    /// Milliseconds since the host was created
    pub fn elapsed_msec(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Register a plugin linked into the host
    pub fn register(&mut self, plugin: PluginDescriptor) -> Result<usize, RegistryError> {
        self.registry.register(plugin)
    }

    /// Register the plugins behind a C entry point linked into the host
    pub fn register_entry(&mut self, entry: PluginEntryFn) -> Result<usize, RegistryError> {
        register_entry(&mut self.registry, entry, None)
    }

    /// Scan all plugin directories
    pub fn load_plugins(&mut self, extra_dir: Option<&Path>) -> usize {
        PluginLoader::load_all(&mut self.registry, extra_dir)
    }

    /// Run every plugin's init hook once. Plugins that fail are removed.
    pub fn init_plugins(&mut self) {
        let mut failed = Vec::new();
        {
            let mut host = HostApi::new(&mut self.config, &self.env);
            for idx in 0..self.registry.count() {
                let Some(plugin) = self.registry.by_index_mut(idx) else { continue };
                if !plugin.provides(Hook::Init) {
                    continue;
                }
                if let Err(e) = plugin.hooks_mut().init(&mut host) {
                    warn!("{}: init failed, removing: {}", plugin.name(), e);
                    failed.push(idx);
                }
            }
        }

        for idx in failed.into_iter().rev() {
            if let Err(e) = self.remove_plugin(idx) {
                warn!("{}", e);
            }
        }
        self.dispatch_changes();
    }

    pub fn active_index(&self) -> Option<usize> {
        self.activation.current()
    }

    pub fn active(&self) -> Option<&PluginDescriptor> {
        self.activation.current_descriptor(&self.registry)
    }

    pub fn activate(&mut self, idx: usize) -> Result<(), ActivationError> {
        let msec = self.elapsed_msec();
        let result = {
            let mut host = HostApi::new(&mut self.config, &self.env);
            self.activation.activate(idx, &mut self.registry, &mut host, msec)
        };
        self.drain_changes(result.is_ok());
        result
    }

    /// Activate by case-insensitive name and remember the choice in
    /// `xlivebg.active`
    pub fn activate_by_name(&mut self, name: &str) -> Result<(), ActivationError> {
        let idx = self
            .registry
            .position(name)
            .ok_or_else(|| ActivationError::UnknownPlugin(name.to_string()))?;
        self.activate(idx)?;

        if let Some(actual) = self.registry.by_index(idx).map(|p| p.name().to_string()) {
            if let Err(e) = self.config.set(CFG_ACTIVE, ConfigValue::String(actual)) {
                warn!("failed to record active plugin: {}", e);
            }
        }
        self.drain_changes(true);
        Ok(())
    }

    /// Activate the configured plugin, or the first registered one
    pub fn activate_configured(&mut self) -> Result<(), ActivationError> {
        if self.registry.is_empty() {
            return Err(ActivationError::UnknownPlugin("no plugins available".into()));
        }
        if let Some(name) = self.settings().active {
            match self.registry.position(&name) {
                Some(idx) => return self.activate(idx),
                None => warn!("configured plugin \"{}\" not found", name),
            }
        }
        self.activate(0)
    }

    pub fn deactivate(&mut self) {
        let mut host = HostApi::new(&mut self.config, &self.env);
        self.activation.deactivate(&mut self.registry, &mut host);
    }

    /// Write a setting and deliver the change
    pub fn set_config(&mut self, path: &str, value: ConfigValue) -> Result<(), ConfigError> {
        self.config.set(path, value)?;
        self.dispatch_changes();
        Ok(())
    }

    pub fn save_config(&self) -> Result<PathBuf, ConfigError> {
        self.config.save_default()
    }

    /// Deliver every queued config change to the active plugin
    pub fn dispatch_changes(&mut self) {
        self.drain_changes(false);
    }

    fn drain_changes(&mut self, just_started: bool) {
        if !self.config.has_pending_changes() {
            return;
        }
        let msec = self.elapsed_msec();
        self.notifier.begin_batch(just_started);

        for _ in 0..MAX_DISPATCH_ROUNDS {
            let changes = self.config.take_changes();
            if changes.is_empty() {
                return;
            }
            let mut host = HostApi::new(&mut self.config, &self.env);
            for path in changes {
                self.notifier
                    .notify(&path, &mut self.activation, &mut self.registry, &mut host, msec);
            }
        }

        let dropped = self.config.take_changes();
        if !dropped.is_empty() {
            warn!("config change loop, dropping {} notification(s)", dropped.len());
        }
    }

    /// Render one frame of the active plugin
    pub fn draw(&mut self) {
        let msec = self.elapsed_msec();
        {
            let mut host = HostApi::new(&mut self.config, &self.env);
            self.activation.draw(&mut self.registry, &mut host, msec);
        }
        self.dispatch_changes();
    }

    /// Unload plugin `idx`. The active plugin is deactivated first.
    pub fn remove_plugin(&mut self, idx: usize) -> Result<(), RegistryError> {
        if idx >= self.registry.count() {
            return Err(RegistryError::OutOfRange(idx));
        }
        if self.activation.current() == Some(idx) {
            info!("deactivating plugin before removal");
            self.deactivate();
        }
        self.registry.remove(idx)?;
        self.activation.plugin_removed(idx);
        Ok(())
    }

    /// Time between frames: the fps override, else the plugin's own
    /// interval, else the default pacing
    pub fn frame_interval_usec(&self) -> u64 {
        let usec = match self.settings().fps_interval_usec() {
            Some(usec) => usec,
            None => match self.activation.upd_interval_usec() {
                0 => DEFAULT_FRAME_INTERVAL_USEC,
                usec => usec,
            },
        };
        usec.max(MIN_FRAME_INTERVAL_USEC)
    }

    pub fn image_projection(&self, scr: usize, image_aspect: f32) -> Matrix4 {
        self.env.image_projection(&self.config, scr, image_aspect)
    }

    pub fn viewport(&self, scr: usize) -> Option<[i32; 4]> {
        self.env.viewport(scr)
    }

    /// Stop the active plugin; plugins are unloaded when the host drops
    pub fn shutdown(&mut self) {
        if self.activation.is_active() {
            debug!("shutting down active plugin");
            self.deactivate();
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}
