/*
 *  plugin/adapter.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugin adapter - wraps C ABI plugins as Rust trait objects
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

use std::ffi::{c_char, c_int, c_long, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use log::{debug, error};

use crate::api::HostApi;
use crate::projection::FitMode;
use crate::screen::ImageInfo;
use crate::store::{ConfigValue, ConfigVector, MAX_VECTOR_LEN};
use super::descriptor::{Hook, PluginDescriptor, PluginError, PluginHooks};
use super::ffi::{
    XlbHostApi,
    XlbImage,
    XlbPlugin,
    XlbScreen,
    XLB_FIT_CROP,
    XLB_FIT_FULL,
    XLB_FIT_STRETCH,
};
use super::registry::RegistryError;

/// Adapter that wraps a C plugin descriptor to implement `PluginHooks`.
///
/// The descriptor lives in the module's data segment; the owning
/// `PluginDescriptor` keeps the module loaded for as long as this exists.
pub struct FfiPlugin {
    raw: *const XlbPlugin,
}

impl FfiPlugin {
    fn plugin(&self) -> &XlbPlugin {
        // SAFETY: checked non-null at construction, and the module stays
        // loaded while the adapter is alive
        unsafe { &*self.raw }
    }
}

/// Build a descriptor from a C plugin struct handed over by a module.
///
/// # Safety
///
/// `raw` must be null or point to an `XlbPlugin` whose strings and hooks
/// stay valid until the returned descriptor is dropped.
pub unsafe fn descriptor_from_raw(raw: *const XlbPlugin) -> Result<PluginDescriptor, RegistryError> {
    if raw.is_null() {
        return Err(RegistryError::InvalidDescriptor("null plugin".into()));
    }
    let plugin = unsafe { &*raw };

    let name = unsafe { c_text(plugin.name) }
        .ok_or_else(|| RegistryError::InvalidDescriptor("plugin without a name".into()))?;
    if plugin.draw.is_none() {
        return Err(RegistryError::InvalidDescriptor(format!("{}: no draw function", name)));
    }
    let desc = unsafe { c_text(plugin.desc) }.unwrap_or_default();
    let props = unsafe { c_text(plugin.props) }.unwrap_or_default();
    let interval = u64::try_from(plugin.upd_interval).unwrap_or(0);

    debug!("C plugin descriptor: {} ({} usec)", name, interval);
    Ok(PluginDescriptor::new(&name, &desc, &props, interval, Box::new(FfiPlugin { raw })))
}

impl PluginHooks for FfiPlugin {
    fn provides(&self, hook: Hook) -> bool {
        let p = self.plugin();
        match hook {
            Hook::Init => p.init.is_some(),
            Hook::Cleanup => p.cleanup.is_some(),
            Hook::Start => p.start.is_some(),
            Hook::Stop => p.stop.is_some(),
            Hook::Draw => p.draw.is_some(),
            Hook::PropertyChanged => p.prop.is_some(),
        }
    }

    fn init(&mut self, host: &mut HostApi<'_>) -> Result<(), PluginError> {
        let (init, data) = (self.plugin().init, self.plugin().data);
        let Some(init) = init else { return Ok(()) };
        let table = host_table(host);
        let status = catch_ffi_call(|| init(&table, data))?;
        if status < 0 {
            return Err(PluginError::HookFailed(format!("init returned {}", status)));
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        let (cleanup, data) = (self.plugin().cleanup, self.plugin().data);
        if let Some(cleanup) = cleanup {
            let _ = catch_ffi_call(|| cleanup(data));
        }
    }

    fn start(&mut self, msec: u64, host: &mut HostApi<'_>) -> Result<(), PluginError> {
        let (start, data) = (self.plugin().start, self.plugin().data);
        let Some(start) = start else { return Ok(()) };
        let table = host_table(host);
        let status = catch_ffi_call(|| start(msec as c_long, &table, data))?;
        if status < 0 {
            return Err(PluginError::HookFailed(format!("start returned {}", status)));
        }
        Ok(())
    }

    fn stop(&mut self, host: &mut HostApi<'_>) {
        let (stop, data) = (self.plugin().stop, self.plugin().data);
        if let Some(stop) = stop {
            let table = host_table(host);
            let _ = catch_ffi_call(|| stop(&table, data));
        }
    }

    fn draw(&mut self, msec: u64, host: &mut HostApi<'_>) {
        let (draw, data) = (self.plugin().draw, self.plugin().data);
        if let Some(draw) = draw {
            let table = host_table(host);
            let _ = catch_ffi_call(|| draw(msec as c_long, &table, data));
        }
    }

    fn property_changed(&mut self, id: &str, host: &mut HostApi<'_>) {
        let (prop, data) = (self.plugin().prop, self.plugin().data);
        let Some(prop) = prop else { return };
        let Ok(id) = CString::new(id) else { return };
        let table = host_table(host);
        let _ = catch_ffi_call(|| prop(id.as_ptr(), &table, data));
    }
}

/// Wrap an FFI call with panic safety
///
/// Panics in plugin code must not unwind into the caller; they are logged
/// and turned into a `PluginError`.
fn catch_ffi_call<T, F>(f: F) -> Result<T, PluginError>
where
    F: FnOnce() -> T,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown error".to_string()
            };

            error!("Caught panic in plugin FFI call: {}", message);
            Err(PluginError::Panic(message))
        }
    }
}

/// Copy a C string, None for null
unsafe fn c_text(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
}

/// Function table handed to C hooks. `ctx` points at `host`, which outlives
/// the table since both only live for one hook call.
fn host_table(host: &mut HostApi<'_>) -> XlbHostApi {
    XlbHostApi {
        ctx: host as *mut HostApi<'_> as *mut c_void,
        screen_count: api_screen_count,
        screen: api_screen,
        bg_image: api_bg_image,
        anim_mask: api_anim_mask,
        fit_mode: api_fit_mode,
        crop_zoom: api_crop_zoom,
        crop_dir: api_crop_dir,
        calc_image_proj: api_calc_image_proj,
        mouse_pos: api_mouse_pos,
        havecfg: api_havecfg,
        getcfg_str: api_getcfg_str,
        getcfg_num: api_getcfg_num,
        getcfg_int: api_getcfg_int,
        getcfg_vec: api_getcfg_vec,
        setcfg_str: api_setcfg_str,
        setcfg_num: api_setcfg_num,
        setcfg_int: api_setcfg_int,
        setcfg_vec: api_setcfg_vec,
        defcfg_str: api_defcfg_str,
        defcfg_num: api_defcfg_num,
        defcfg_int: api_defcfg_int,
        defcfg_vec: api_defcfg_vec,
    }
}

// ---- host side of the function table ----

/// # Safety
/// `ctx` must be the pointer stored by `host_table` during a live hook call
unsafe fn host<'c>(ctx: *mut c_void) -> &'c mut HostApi<'c> {
    unsafe { &mut *(ctx as *mut HostApi<'c>) }
}

unsafe fn path_arg<'c>(path: *const c_char) -> Option<&'c str> {
    if path.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(path) }.to_str().ok()
}

fn screen_index(scr: c_int) -> Option<usize> {
    usize::try_from(scr).ok()
}

fn status(ok: bool) -> c_int {
    if ok { 0 } else { -1 }
}

fn image_out(image: Option<ImageInfo>, out: *mut XlbImage) -> c_int {
    match image {
        Some(img) if !out.is_null() => {
            unsafe {
                *out = XlbImage {
                    width: img.width,
                    height: img.height,
                    tex: img.texture,
                };
            }
            0
        }
        _ => -1,
    }
}

extern "C" fn api_screen_count(ctx: *mut c_void) -> c_int {
    unsafe { host(ctx) }.screen_count() as c_int
}

extern "C" fn api_screen(ctx: *mut c_void, idx: c_int, out: *mut XlbScreen) -> c_int {
    let api = unsafe { host(ctx) };
    match screen_index(idx).and_then(|i| api.screen(i)) {
        Some(s) if !out.is_null() => {
            unsafe {
                *out = XlbScreen {
                    width: s.width,
                    height: s.height,
                    vport: s.viewport,
                };
            }
            0
        }
        _ => -1,
    }
}

extern "C" fn api_bg_image(ctx: *mut c_void, scr: c_int, out: *mut XlbImage) -> c_int {
    let api = unsafe { host(ctx) };
    image_out(screen_index(scr).and_then(|i| api.bg_image(i)), out)
}

extern "C" fn api_anim_mask(ctx: *mut c_void, scr: c_int, out: *mut XlbImage) -> c_int {
    let api = unsafe { host(ctx) };
    image_out(screen_index(scr).and_then(|i| api.anim_mask(i)), out)
}

extern "C" fn api_fit_mode(ctx: *mut c_void, scr: c_int) -> c_int {
    match unsafe { host(ctx) }.fit_mode(screen_index(scr).unwrap_or(0)) {
        FitMode::Full => XLB_FIT_FULL,
        FitMode::Crop => XLB_FIT_CROP,
        FitMode::Stretch => XLB_FIT_STRETCH,
    }
}

extern "C" fn api_crop_zoom(ctx: *mut c_void, scr: c_int) -> f32 {
    unsafe { host(ctx) }.crop_zoom(screen_index(scr).unwrap_or(0))
}

extern "C" fn api_crop_dir(ctx: *mut c_void, scr: c_int, dir: *mut f32) {
    if dir.is_null() {
        return;
    }
    let d = unsafe { host(ctx) }.crop_dir(screen_index(scr).unwrap_or(0));
    unsafe { ptr::copy_nonoverlapping(d.as_ptr(), dir, 2) };
}

extern "C" fn api_calc_image_proj(ctx: *mut c_void, scr: c_int, img_aspect: f32, xform: *mut f32) {
    if xform.is_null() {
        return;
    }
    let m = unsafe { host(ctx) }.image_projection(screen_index(scr).unwrap_or(0), img_aspect);
    unsafe { ptr::copy_nonoverlapping(m.as_ptr(), xform, m.len()) };
}

extern "C" fn api_mouse_pos(ctx: *mut c_void, x: *mut c_int, y: *mut c_int) {
    let (mx, my) = unsafe { host(ctx) }.mouse_pos();
    unsafe {
        if !x.is_null() {
            *x = mx;
        }
        if !y.is_null() {
            *y = my;
        }
    }
}

extern "C" fn api_havecfg(ctx: *mut c_void, path: *const c_char) -> c_int {
    let Some(path) = (unsafe { path_arg(path) }) else { return 0 };
    unsafe { host(ctx) }.has(path) as c_int
}

extern "C" fn api_getcfg_str(ctx: *mut c_void, path: *const c_char, buf: *mut c_char, size: usize) -> c_int {
    let Some(path) = (unsafe { path_arg(path) }) else { return -1 };
    let api = unsafe { host(ctx) };
    let Some(ConfigValue::String(s)) = api.get(path) else { return -1 };

    if !buf.is_null() && size > 0 {
        let n = s.len().min(size - 1);
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, buf, n);
            *buf.add(n) = 0;
        }
    }
    c_int::try_from(s.len()).unwrap_or(c_int::MAX)
}

extern "C" fn api_getcfg_num(ctx: *mut c_void, path: *const c_char, def: f32) -> f32 {
    let Some(path) = (unsafe { path_arg(path) }) else { return def };
    unsafe { host(ctx) }.number(path, def as f64) as f32
}

extern "C" fn api_getcfg_int(ctx: *mut c_void, path: *const c_char, def: c_int) -> c_int {
    let Some(path) = (unsafe { path_arg(path) }) else { return def };
    let v = unsafe { host(ctx) }.integer(path, def as i64);
    c_int::try_from(v).unwrap_or(def)
}

extern "C" fn api_getcfg_vec(ctx: *mut c_void, path: *const c_char, vec: *mut f32) -> c_int {
    let Some(path) = (unsafe { path_arg(path) }) else { return -1 };
    let Some(ConfigValue::Vector(v)) = (unsafe { host(ctx) }.get(path)) else { return -1 };
    if !vec.is_null() {
        for (i, c) in v.as_array().iter().enumerate() {
            unsafe { *vec.add(i) = *c as f32 };
        }
    }
    0
}

unsafe fn vec_arg(vec: *const f32) -> Option<ConfigValue> {
    if vec.is_null() {
        return None;
    }
    let mut v = [0.0f64; MAX_VECTOR_LEN];
    for (i, c) in v.iter_mut().enumerate() {
        *c = unsafe { *vec.add(i) } as f64;
    }
    Some(ConfigValue::Vector(ConfigVector::from(v)))
}

fn write_cfg(ctx: *mut c_void, path: *const c_char, value: Option<ConfigValue>, only_default: bool) -> c_int {
    let (Some(path), Some(value)) = (unsafe { path_arg(path) }, value) else {
        return -1;
    };
    let api = unsafe { host(ctx) };
    let result = if only_default {
        api.set_default(path, value).map(|_| ())
    } else {
        api.set(path, value)
    };
    if let Err(e) = &result {
        debug!("plugin config write to {} failed: {}", path, e);
    }
    status(result.is_ok())
}

fn str_value(s: *const c_char) -> Option<ConfigValue> {
    unsafe { c_text(s) }.map(ConfigValue::String)
}

extern "C" fn api_setcfg_str(ctx: *mut c_void, path: *const c_char, s: *const c_char) -> c_int {
    write_cfg(ctx, path, str_value(s), false)
}

extern "C" fn api_setcfg_num(ctx: *mut c_void, path: *const c_char, v: f32) -> c_int {
    write_cfg(ctx, path, Some(ConfigValue::Number(v as f64)), false)
}

extern "C" fn api_setcfg_int(ctx: *mut c_void, path: *const c_char, v: c_int) -> c_int {
    write_cfg(ctx, path, Some(ConfigValue::Integer(v as i64)), false)
}

extern "C" fn api_setcfg_vec(ctx: *mut c_void, path: *const c_char, vec: *const f32) -> c_int {
    write_cfg(ctx, path, unsafe { vec_arg(vec) }, false)
}

extern "C" fn api_defcfg_str(ctx: *mut c_void, path: *const c_char, s: *const c_char) -> c_int {
    write_cfg(ctx, path, str_value(s), true)
}

extern "C" fn api_defcfg_num(ctx: *mut c_void, path: *const c_char, v: f32) -> c_int {
    write_cfg(ctx, path, Some(ConfigValue::Number(v as f64)), true)
}

extern "C" fn api_defcfg_int(ctx: *mut c_void, path: *const c_char, v: c_int) -> c_int {
    write_cfg(ctx, path, Some(ConfigValue::Integer(v as i64)), true)
}

extern "C" fn api_defcfg_vec(ctx: *mut c_void, path: *const c_char, vec: *const f32) -> c_int {
    write_cfg(ctx, path, unsafe { vec_arg(vec) }, true)
}
