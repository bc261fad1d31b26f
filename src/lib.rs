/*
 *  lib.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Live wallpaper host library
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

//! xlivebg hosts live wallpaper plugins.
//!
//! The host keeps a tree of settings ([`store::ConfigStore`]), a registry of
//! loaded plugins ([`plugin::PluginRegistry`]) and exactly one active plugin
//! at a time ([`activation::ActivationController`]). Setting changes are
//! routed to the active plugin ([`notify`]), either as a targeted property
//! notification or as a full restart. [`projection`] computes how a
//! background image is fitted to each screen.
//!
//! [`host::Host`] owns all of it and is what the binary drives.

pub mod activation;
pub mod api;
pub mod config;
pub mod constants;
pub mod control;
pub mod host;
pub mod notify;
pub mod pacer;
pub mod plugin;
pub mod projection;
pub mod render;
pub mod screen;
pub mod settings;
pub mod store;

pub use activation::{ActivationController, ActivationError};
pub use api::{HostApi, HostEnv};
pub use host::Host;
pub use notify::NotifyOutcome;
pub use plugin::{Hook, PluginDescriptor, PluginError, PluginHooks, PluginRegistry};
pub use store::{ConfigStore, ConfigValue};
