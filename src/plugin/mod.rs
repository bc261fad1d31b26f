/*
 *  plugin/mod.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Wallpaper plugin system
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

//! Dynamic plugin system for xlivebg wallpapers
//!
//! Every live wallpaper is a plugin. Plugins are either shared objects
//! loaded at runtime or Rust types implementing [`PluginHooks`] that are
//! registered directly.
//!
//! ## Architecture
//!
//! 1. **FFI Layer** (`ffi.rs`) - C ABI types for the plugin interface
//! 2. **Loader** (`loader.rs`) - Discovers modules and runs their entry point
//! 3. **Adapter** (`adapter.rs`) - Wraps C ABI plugins as Rust trait objects
//! 4. **Registry** (`registry.rs`) - Ordered set of registered plugins
//! 5. **Property lists** (`proplist.rs`) - Parser for declared tunables
//!
//! ## Plugin Discovery
//!
//! Plugins are searched in the following locations (in priority order):
//!
//! 1. `--plugin-dir` (command line)
//! 2. `$XLIVEBG_PLUGIN_PATH` (environment variable, colon separated)
//! 3. `$PREFIX/lib/xlivebg/` (system)
//! 4. `~/.local/lib/xlivebg/` (user-local)
//! 5. `~/.xlivebg/plugins/` (user-local alt)
//!
//! Every regular file in those directories is tried. Files without a
//! `register_plugin` entry point are unloaded again.

pub mod adapter;
pub mod descriptor;
pub mod ffi;
pub mod loader;
pub mod proplist;
pub mod registry;

// Re-exports for convenience
pub use descriptor::{Hook, PluginDescriptor, PluginError, PluginHooks};
pub use ffi::{PluginEntryFn, XlbHostApi, XlbImage, XlbPlugin, XlbRegistrar, XlbScreen};
pub use loader::{register_entry, PluginLoader};
pub use proplist::{PropertyKind, PropertySpec};
pub use registry::{PluginRegistry, RegistryError};
