/*
 *  plugin/descriptor.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugin descriptor and lifecycle hook trait
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
use std::rc::Rc;

use libloading::Library;
use log::{debug, warn};
use thiserror::Error;

use crate::api::HostApi;
use crate::constants::ROOT_NAME;
use super::proplist::{self, PropertySpec};

/// Lifecycle hooks a plugin may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Init,
    Cleanup,
    Start,
    Stop,
    Draw,
    PropertyChanged,
}

/// Failure reported by a plugin hook
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin hook failed: {0}")]
    HookFailed(String),

    #[error("plugin panic: {0}")]
    Panic(String),
}

/// Polymorphic lifecycle hooks of a wallpaper plugin.
///
/// Only `draw` is mandatory. The host asks `provides` before calling any
/// other hook; a plugin that does not provide `PropertyChanged` is restarted
/// whenever one of its settings changes.
pub trait PluginHooks {
    fn provides(&self, hook: Hook) -> bool;

    /// Called once after the plugin is registered. Typical use is writing
    /// default settings with `HostApi::default_*`.
    fn init(&mut self, _host: &mut HostApi<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called right before the module is unloaded
    fn cleanup(&mut self) {}

    fn start(&mut self, _msec: u64, _host: &mut HostApi<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop(&mut self, _host: &mut HostApi<'_>) {}

    fn draw(&mut self, msec: u64, host: &mut HostApi<'_>);

    fn property_changed(&mut self, _id: &str, _host: &mut HostApi<'_>) {}
}

/// One registered plugin.
///
/// Field order matters: `hooks` may point into the loaded module, so it is
/// dropped before `module`.
pub struct PluginDescriptor {
    name: String,
    description: String,
    props_text: String,
    properties: Option<Vec<PropertySpec>>,
    upd_interval_usec: u64,
    hooks: Box<dyn PluginHooks>,
    module: Option<Rc<Library>>,
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("properties", &self.properties)
            .field("upd_interval_usec", &self.upd_interval_usec)
            .field("dynamic", &self.module.is_some())
            .finish()
    }
}

impl PluginDescriptor {
    /// Build a descriptor, parsing the property list once up front.
    ///
    /// A malformed property list is logged and treated as no list at all, so
    /// the plugin falls back to being restarted on every settings change.
    pub fn new(
        name: &str,
        description: &str,
        props_text: &str,
        upd_interval_usec: u64,
        hooks: Box<dyn PluginHooks>,
    ) -> Self {
        let properties = if props_text.trim().is_empty() {
            None
        } else {
            match proplist::parse(props_text) {
                Ok(props) => {
                    debug!("{}: {} declared properties", name, props.len());
                    Some(props)
                }
                Err(e) => {
                    warn!("{}: ignoring malformed property list: {}", name, e);
                    None
                }
            }
        };

        Self {
            name: name.to_string(),
            description: description.to_string(),
            props_text: props_text.to_string(),
            properties,
            upd_interval_usec,
            hooks,
            module: None,
        }
    }

    /// Tie the descriptor to the module it came from
    pub(crate) fn with_module(mut self, module: Rc<Library>) -> Self {
        self.module = Some(module);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn props_text(&self) -> &str {
        &self.props_text
    }

    /// Parsed properties, empty when none were declared
    pub fn properties(&self) -> &[PropertySpec] {
        self.properties.as_deref().unwrap_or(&[])
    }

    /// Whether a property list was given, even one declaring no ids
    pub fn declares_properties(&self) -> bool {
        self.properties.is_some()
    }

    pub fn property(&self, id: &str) -> Option<&PropertySpec> {
        self.properties().iter().find(|p| p.id == id)
    }

    /// Target frame interval in microseconds, 0 for none
    pub fn upd_interval_usec(&self) -> u64 {
        self.upd_interval_usec
    }

    /// Config namespace prefix, `xlivebg.<name>.`
    pub fn namespace(&self) -> String {
        format!("{}.{}.", ROOT_NAME, self.name)
    }

    pub fn is_dynamic(&self) -> bool {
        self.module.is_some()
    }

    pub fn provides(&self, hook: Hook) -> bool {
        self.hooks.provides(hook)
    }

    pub fn hooks_mut(&mut self) -> &mut dyn PluginHooks {
        self.hooks.as_mut()
    }

    /// Run the cleanup hook and release the module
    pub fn unload(mut self) {
        if self.hooks.provides(Hook::Cleanup) {
            self.hooks.cleanup();
        }
        debug!("unloaded plugin: {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl PluginHooks for Blank {
        fn provides(&self, hook: Hook) -> bool {
            hook == Hook::Draw
        }

        fn draw(&mut self, _msec: u64, _host: &mut HostApi<'_>) {}
    }

    #[test]
    fn test_namespace() {
        let d = PluginDescriptor::new("distort", "", "", 40_000, Box::new(Blank));
        assert_eq!(d.namespace(), "xlivebg.distort.");
        assert!(!d.is_dynamic());
    }

    #[test]
    fn test_property_lookup() {
        let d = PluginDescriptor::new(
            "ripple",
            "water ripples",
            "proplist { prop { id = \"speed\" type = \"number\" } }",
            0,
            Box::new(Blank),
        );
        assert!(d.declares_properties());
        assert!(d.property("speed").is_some());
        assert!(d.property("depth").is_none());
    }

    #[test]
    fn test_malformed_props_count_as_undeclared() {
        let d = PluginDescriptor::new("bad", "", "proplist { prop {", 0, Box::new(Blank));
        assert!(!d.declares_properties());
        assert_eq!(d.props_text(), "proplist { prop {");
    }

    #[test]
    fn test_empty_list_still_declared() {
        let d = PluginDescriptor::new("plasma", "", "proplist { }", 0, Box::new(Blank));
        assert!(d.declares_properties());
        assert!(d.properties().is_empty());

        let d = PluginDescriptor::new("plasma", "", "", 0, Box::new(Blank));
        assert!(!d.declares_properties());
    }
}
