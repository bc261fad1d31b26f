/*
 *  plugin/ffi.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI types for the plugin interface
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

//! FFI types for the xlivebg plugin system
//!
//! This module defines C-compatible types that form the stable ABI
//! between the host and plugin modules. All types use `#[repr(C)]`
//! to ensure consistent memory layout across compilation units.
//!
//! A module exports `register_plugin`. The host calls it right after
//! loading, and the module pushes its `XlbPlugin` descriptor(s) back through
//! the registrar callback:
//!
//! ```c
//! static struct xlb_plugin plugin = { "distort", "...", PROPLIST, 40000, init, 0, start, 0, draw, prop, 0 };
//!
//! int register_plugin(const struct xlb_registrar *reg)
//! {
//!     return reg->register_plugin(reg->ctx, &plugin);
//! }
//! ```
//!
//! Every hook receives the host API table, through which it reads screens,
//! images and configuration.

use std::ffi::{c_char, c_int, c_long, c_void};

/// Descriptor a plugin module hands to the host.
///
/// The strings and the struct itself must stay valid while the module is
/// loaded. `props` may be null.
#[repr(C)]
pub struct XlbPlugin {
    pub name: *const c_char,
    pub desc: *const c_char,
    pub props: *const c_char,
    /// Target frame interval in microseconds, 0 for none
    pub upd_interval: c_long,

    pub init: Option<extern "C" fn(api: *const XlbHostApi, cls: *mut c_void) -> c_int>,
    pub cleanup: Option<extern "C" fn(cls: *mut c_void)>,
    pub start: Option<extern "C" fn(tmsec: c_long, api: *const XlbHostApi, cls: *mut c_void) -> c_int>,
    pub stop: Option<extern "C" fn(api: *const XlbHostApi, cls: *mut c_void)>,
    pub draw: Option<extern "C" fn(tmsec: c_long, api: *const XlbHostApi, cls: *mut c_void)>,
    pub prop: Option<extern "C" fn(id: *const c_char, api: *const XlbHostApi, cls: *mut c_void)>,

    /// Opaque plugin state passed back to every hook
    pub data: *mut c_void,
}

/// Registration callback table passed to the module entry point
#[repr(C)]
pub struct XlbRegistrar {
    pub ctx: *mut c_void,
    pub register_plugin: extern "C" fn(ctx: *mut c_void, plugin: *const XlbPlugin) -> c_int,
}

/// Module entry point type
///
/// Each plugin must export a function with this signature:
/// ```c
/// int register_plugin(const struct xlb_registrar *reg);
/// ```
pub type PluginEntryFn = extern "C" fn(reg: *const XlbRegistrar) -> c_int;

/// Screen geometry as seen by plugins
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XlbScreen {
    pub width: c_int,
    pub height: c_int,
    pub vport: [c_int; 4],
}

/// Image metadata as seen by plugins
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XlbImage {
    pub width: c_int,
    pub height: c_int,
    /// GL texture name, 0 if not uploaded
    pub tex: u32,
}

/// Fit modes, numbered as in the C header
pub const XLB_FIT_FULL: c_int = 0;
pub const XLB_FIT_CROP: c_int = 1;
pub const XLB_FIT_STRETCH: c_int = 2;

/// Host services available to plugin hooks.
///
/// `ctx` must be passed back as the first argument of every call. Functions
/// returning `c_int` status use 0 for success and -1 for failure. Strings are
/// copied out into caller buffers; nothing returned points into host memory.
#[repr(C)]
pub struct XlbHostApi {
    pub ctx: *mut c_void,

    pub screen_count: extern "C" fn(ctx: *mut c_void) -> c_int,
    pub screen: extern "C" fn(ctx: *mut c_void, idx: c_int, out: *mut XlbScreen) -> c_int,
    pub bg_image: extern "C" fn(ctx: *mut c_void, scr: c_int, out: *mut XlbImage) -> c_int,
    pub anim_mask: extern "C" fn(ctx: *mut c_void, scr: c_int, out: *mut XlbImage) -> c_int,

    pub fit_mode: extern "C" fn(ctx: *mut c_void, scr: c_int) -> c_int,
    pub crop_zoom: extern "C" fn(ctx: *mut c_void, scr: c_int) -> f32,
    pub crop_dir: extern "C" fn(ctx: *mut c_void, scr: c_int, dir: *mut f32),
    pub calc_image_proj: extern "C" fn(ctx: *mut c_void, scr: c_int, img_aspect: f32, xform: *mut f32),
    pub mouse_pos: extern "C" fn(ctx: *mut c_void, x: *mut c_int, y: *mut c_int),

    pub havecfg: extern "C" fn(ctx: *mut c_void, path: *const c_char) -> c_int,
    /// Copies the string (NUL terminated, truncated to `size`) and returns its
    /// full length, or -1 if missing, in which case `buf` is untouched
    pub getcfg_str: extern "C" fn(ctx: *mut c_void, path: *const c_char, buf: *mut c_char, size: usize) -> c_int,
    pub getcfg_num: extern "C" fn(ctx: *mut c_void, path: *const c_char, def: f32) -> f32,
    pub getcfg_int: extern "C" fn(ctx: *mut c_void, path: *const c_char, def: c_int) -> c_int,
    /// Fills `vec[0..4]`; leaves it untouched and returns -1 if missing
    pub getcfg_vec: extern "C" fn(ctx: *mut c_void, path: *const c_char, vec: *mut f32) -> c_int,

    pub setcfg_str: extern "C" fn(ctx: *mut c_void, path: *const c_char, s: *const c_char) -> c_int,
    pub setcfg_num: extern "C" fn(ctx: *mut c_void, path: *const c_char, v: f32) -> c_int,
    pub setcfg_int: extern "C" fn(ctx: *mut c_void, path: *const c_char, v: c_int) -> c_int,
    pub setcfg_vec: extern "C" fn(ctx: *mut c_void, path: *const c_char, vec: *const f32) -> c_int,

    pub defcfg_str: extern "C" fn(ctx: *mut c_void, path: *const c_char, s: *const c_char) -> c_int,
    pub defcfg_num: extern "C" fn(ctx: *mut c_void, path: *const c_char, v: f32) -> c_int,
    pub defcfg_int: extern "C" fn(ctx: *mut c_void, path: *const c_char, v: c_int) -> c_int,
    pub defcfg_vec: extern "C" fn(ctx: *mut c_void, path: *const c_char, vec: *const f32) -> c_int,
}
