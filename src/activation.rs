/*
 *  activation.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Active plugin state machine and render context lifecycle
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

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::api::HostApi;
use crate::plugin::{Hook, PluginDescriptor, PluginRegistry};
use crate::render::{RenderBackend, RenderError};

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("no such plugin: {0}")]
    UnknownPlugin(String),

    #[error("render context unavailable: {0}")]
    RenderContextUnavailable(#[from] RenderError),
}

/// Idle, or Active with exactly one plugin.
///
/// The controller owns the render context. A plugin is only ever reported
/// active while a live context exists.
pub struct ActivationController {
    backend: Box<dyn RenderBackend>,
    context_live: bool,
    active: Option<usize>,
    upd_interval_usec: u64,
}

impl std::fmt::Debug for ActivationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationController")
            .field("backend", &self.backend.name())
            .field("context_live", &self.context_live)
            .field("active", &self.active)
            .field("upd_interval_usec", &self.upd_interval_usec)
            .finish()
    }
}

impl ActivationController {
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            context_live: false,
            active: None,
            upd_interval_usec: 0,
        }
    }

    /// Registry index of the active plugin
    pub fn current(&self) -> Option<usize> {
        self.active
    }

    pub fn current_descriptor<'r>(&self, plugins: &'r PluginRegistry) -> Option<&'r PluginDescriptor> {
        self.active.and_then(|idx| plugins.by_index(idx))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Frame interval the active plugin asked for, 0 for none
    pub fn upd_interval_usec(&self) -> u64 {
        self.upd_interval_usec
    }

    pub fn context_live(&self) -> bool {
        self.context_live
    }

    /// Make plugin `idx` the active one.
    ///
    /// The previous plugin is stopped and its context released first. If a
    /// new context cannot be created the controller stays Idle.
    pub fn activate(
        &mut self,
        idx: usize,
        plugins: &mut PluginRegistry,
        host: &mut HostApi<'_>,
        msec: u64,
    ) -> Result<(), ActivationError> {
        if plugins.by_index(idx).is_none() {
            return Err(ActivationError::UnknownPlugin(format!("#{}", idx)));
        }

        self.stop_active(plugins, host);

        if let Err(e) = self.backend.create_context() {
            error!("failed to create render context: {}", e);
            return Err(e.into());
        }
        self.context_live = true;

        let Some(plugin) = plugins.by_index_mut(idx) else {
            self.release_context();
            return Err(ActivationError::UnknownPlugin(format!("#{}", idx)));
        };

        info!("activating live wallpaper: {}", plugin.name());
        self.active = Some(idx);
        self.upd_interval_usec = plugin.upd_interval_usec();

        if plugin.provides(Hook::Start) {
            if let Err(e) = plugin.hooks_mut().start(msec, host) {
                warn!("{}: start: {}", plugin.name(), e);
            }
        }
        Ok(())
    }

    /// Stop and start the active plugin again
    pub fn restart(
        &mut self,
        plugins: &mut PluginRegistry,
        host: &mut HostApi<'_>,
        msec: u64,
    ) -> Result<(), ActivationError> {
        match self.active {
            Some(idx) => {
                debug!("restarting active plugin #{}", idx);
                self.activate(idx, plugins, host, msec)
            }
            None => Ok(()),
        }
    }

    /// Stop the active plugin and release the context
    pub fn deactivate(&mut self, plugins: &mut PluginRegistry, host: &mut HostApi<'_>) {
        self.stop_active(plugins, host);
    }

    /// Render one frame of the active plugin
    pub fn draw(&mut self, plugins: &mut PluginRegistry, host: &mut HostApi<'_>, msec: u64) {
        let Some(plugin) = self.active.and_then(|idx| plugins.by_index_mut(idx)) else {
            return;
        };
        plugin.hooks_mut().draw(msec, host);
    }

    /// Keep the active index pointing at the same plugin after entry
    /// `removed` was taken out of the registry
    pub fn plugin_removed(&mut self, removed: usize) {
        match self.active {
            Some(idx) if idx == removed => {
                warn!("active plugin removed from under the controller");
                self.active = None;
                self.release_context();
            }
            Some(idx) if idx > removed => self.active = Some(idx - 1),
            _ => {}
        }
    }

    fn stop_active(&mut self, plugins: &mut PluginRegistry, host: &mut HostApi<'_>) {
        if let Some(idx) = self.active.take() {
            if let Some(plugin) = plugins.by_index_mut(idx) {
                debug!("stopping {}", plugin.name());
                if plugin.provides(Hook::Stop) {
                    plugin.hooks_mut().stop(host);
                }
            }
        }
        self.upd_interval_usec = 0;
        self.release_context();
    }

    fn release_context(&mut self) {
        if self.context_live {
            self.backend.destroy_context();
            self.context_live = false;
        }
    }
}

impl Drop for ActivationController {
    fn drop(&mut self) {
        self.release_context();
    }
}
