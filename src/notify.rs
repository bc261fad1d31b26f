/*
 *  notify.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Routes config changes to the active plugin
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

use log::{debug, info, warn};

use crate::activation::ActivationController;
use crate::api::HostApi;
use crate::plugin::{Hook, PluginDescriptor, PluginRegistry};

/// What a config change meant for the active plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No plugin active
    Idle,
    /// Path outside the active plugin's namespace
    Unrelated,
    /// Plugin cannot take targeted updates and was restarted
    Restarted,
    /// A restart already happened in this batch
    AlreadyRestarted,
    /// Property-changed hook called with this id
    Notified(String),
    /// In the namespace, but not a declared property
    Undeclared,
}

/// Decide what a write to `path` requires, without acting on it
pub fn route(path: &str, active: Option<&PluginDescriptor>) -> NotifyOutcome {
    let Some(plugin) = active else {
        return NotifyOutcome::Idle;
    };
    if !path.contains(&plugin.namespace()) {
        return NotifyOutcome::Unrelated;
    }

    if !plugin.declares_properties() || !plugin.provides(Hook::PropertyChanged) {
        return NotifyOutcome::Restarted;
    }

    let id = path.rsplit('.').next().unwrap_or(path);
    if plugin.property(id).is_some() {
        NotifyOutcome::Notified(id.to_string())
    } else {
        NotifyOutcome::Undeclared
    }
}

/// Delivers change notifications, one batch at a time.
///
/// A batch is everything drained from the store in one go, including writes
/// the notified hooks make themselves. At most one restart runs per batch.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    restarted: bool,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new batch. `just_started` marks a plugin that was activated
    /// right before, which already saw every queued write.
    pub fn begin_batch(&mut self, just_started: bool) {
        self.restarted = just_started;
    }

    pub fn notify(
        &mut self,
        path: &str,
        controller: &mut ActivationController,
        plugins: &mut PluginRegistry,
        host: &mut HostApi<'_>,
        msec: u64,
    ) -> NotifyOutcome {
        let outcome = route(path, controller.current_descriptor(plugins));

        let outcome = match outcome {
            NotifyOutcome::Restarted if self.restarted => NotifyOutcome::AlreadyRestarted,
            NotifyOutcome::Restarted => {
                info!("restarting live wallpaper after change to {}", path);
                self.restarted = true;
                if let Err(e) = controller.restart(plugins, host, msec) {
                    warn!("restart failed: {}", e);
                }
                NotifyOutcome::Restarted
            }
            NotifyOutcome::Notified(id) => {
                if let Some(plugin) = controller.current().and_then(|i| plugins.by_index_mut(i)) {
                    plugin.hooks_mut().property_changed(&id, host);
                }
                NotifyOutcome::Notified(id)
            }
            other => other,
        };

        debug!("notify {}: {:?}", path, outcome);
        outcome
    }
}
