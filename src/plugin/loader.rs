/*
 *  plugin/loader.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugin loader - discovers and loads wallpaper modules
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

use std::ffi::{c_int, c_void};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use libloading::{Library, Symbol};
use log::{debug, info, warn};

use crate::constants::{PLUGIN_ENTRY_SYMBOL, PLUGIN_PATH_ENV, PREFIX};
use super::adapter::descriptor_from_raw;
use super::ffi::{PluginEntryFn, XlbPlugin, XlbRegistrar};
use super::registry::{PluginRegistry, RegistryError};

/// Plugin loader - searches directories for modules and registers them
pub struct PluginLoader;

impl PluginLoader {
    /// Get the search paths for plugins in priority order.
    ///
    /// Earlier directories win when two modules register the same name.
    pub fn search_paths(extra: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Explicit directory from the command line
        if let Some(dir) = extra {
            paths.push(dir.to_path_buf());
        }

        // 2. Environment variable override, colon separated
        if let Ok(value) = std::env::var(PLUGIN_PATH_ENV) {
            paths.extend(
                value
                    .split(':')
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            );
        }

        // 3. Installed plugins
        paths.push(Path::new(PREFIX).join("lib/xlivebg"));

        // 4. User-local directories
        if let Some(home) = dirs_next::home_dir() {
            paths.push(home.join(".local/lib/xlivebg"));
            paths.push(home.join(".xlivebg/plugins"));
        }

        paths
    }

    /// Scan every search path. Unusable directories are logged and skipped.
    pub fn load_all(registry: &mut PluginRegistry, extra: Option<&Path>) -> usize {
        let mut total = 0;
        for dir in Self::search_paths(extra) {
            match Self::scan_and_load(&dir, registry) {
                Ok(n) => total += n,
                Err(RegistryError::DirectoryUnavailable(path, e)) => {
                    debug!("skipping plugin dir {}: {}", path.display(), e);
                }
                Err(e) => warn!("{}", e),
            }
        }
        info!("{} plugin(s) loaded", total);
        total
    }

    /// Load every regular file in `dir` as a module, non-recursively.
    ///
    /// Returns the number of plugins registered from this directory.
    pub fn scan_and_load(dir: &Path, registry: &mut PluginRegistry) -> Result<usize, RegistryError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| RegistryError::DirectoryUnavailable(dir.to_path_buf(), e))?;

        debug!("looking for plugins in {}", dir.display());

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file() || t.is_symlink()))
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut count = 0;
        for path in files {
            match Self::load_module(&path, registry) {
                Ok(n) => count += n,
                Err(RegistryError::OutOfMemory) => return Err(RegistryError::OutOfMemory),
                Err(e @ RegistryError::ModuleLoadFailed(..)) => warn!("{}", e),
                Err(e) => debug!("{}", e),
            }
        }
        Ok(count)
    }

    /// Open one module and run its registration entry point.
    ///
    /// A file that is not a plugin is unloaded again and never registered.
    pub fn load_module(path: &Path, registry: &mut PluginRegistry) -> Result<usize, RegistryError> {
        // SAFETY: loading runs the module's initializers; plugin directories
        // are trusted locations
        let library = unsafe { Library::new(path) }
            .map_err(|e| RegistryError::ModuleLoadFailed(path.to_path_buf(), e.to_string()))?;

        let entry: PluginEntryFn = {
            let symbol: Symbol<PluginEntryFn> = unsafe { library.get(PLUGIN_ENTRY_SYMBOL) }
                .map_err(|_| RegistryError::ModuleMissingEntryPoint(path.to_path_buf()))?;
            *symbol
        };

        let module = Rc::new(library);
        match register_entry(registry, entry, Some(module)) {
            Err(RegistryError::ModuleMissingEntryPoint(_)) => {
                Err(RegistryError::ModuleMissingEntryPoint(path.to_path_buf()))
            }
            other => other,
        }
    }
}

extern "C" fn collect_plugin(ctx: *mut c_void, plugin: *const XlbPlugin) -> c_int {
    if ctx.is_null() || plugin.is_null() {
        return -1;
    }
    let pending = unsafe { &mut *(ctx as *mut Vec<*const XlbPlugin>) };
    if pending.try_reserve(1).is_err() {
        return -1;
    }
    pending.push(plugin);
    0
}

/// Call a module entry point and register everything it hands back.
///
/// `module` is the library the entry point lives in, or None for plugins
/// linked into the host. Registering nothing counts as a missing entry point.
pub fn register_entry(
    registry: &mut PluginRegistry,
    entry: PluginEntryFn,
    module: Option<Rc<Library>>,
) -> Result<usize, RegistryError> {
    let mut pending: Vec<*const XlbPlugin> = Vec::new();
    let registrar = XlbRegistrar {
        ctx: &mut pending as *mut Vec<*const XlbPlugin> as *mut c_void,
        register_plugin: collect_plugin,
    };

    let status = entry(&registrar);
    if status != 0 {
        debug!("plugin entry point returned {}", status);
    }
    if pending.is_empty() {
        return Err(RegistryError::ModuleMissingEntryPoint(PathBuf::new()));
    }

    let mut count = 0;
    for raw in pending {
        // SAFETY: the module stays loaded through the Rc held by the descriptor
        let descriptor = match unsafe { descriptor_from_raw(raw) } {
            Ok(d) => d,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };
        let descriptor = match &module {
            Some(lib) => descriptor.with_module(lib.clone()),
            None => descriptor,
        };
        match registry.register(descriptor) {
            Ok(_) => count += 1,
            Err(RegistryError::OutOfMemory) => return Err(RegistryError::OutOfMemory),
            Err(_) => {}
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{c_char, c_long};
    use std::ptr;

    use crate::plugin::ffi::XlbHostApi;

    #[test]
    fn test_search_paths() {
        let paths = PluginLoader::search_paths(Some(Path::new("/opt/bg")));
        assert_eq!(paths[0], PathBuf::from("/opt/bg"));
        assert!(paths.iter().any(|p| p.ends_with("lib/xlivebg")));
    }

    #[test]
    fn test_missing_directory() {
        let mut reg = PluginRegistry::new();
        let result = PluginLoader::scan_and_load(Path::new("/nonexistent/xlivebg-plugins"), &mut reg);
        assert!(matches!(result, Err(RegistryError::DirectoryUnavailable(..))));
    }

    #[test]
    fn test_non_module_files_skipped() {
        let dir = std::env::temp_dir().join(format!("xlivebg-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("README"), "not a shared object").unwrap();
        fs::create_dir_all(dir.join("subdir")).unwrap();

        let mut reg = PluginRegistry::new();
        let n = PluginLoader::scan_and_load(&dir, &mut reg).unwrap();
        assert_eq!(n, 0);
        assert!(reg.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_shared_object_without_entry_point() {
        // libm is always present with glibc and exports no plugin entry point
        let libm = Path::new("libm.so.6");
        let mut reg = PluginRegistry::new();
        let result = PluginLoader::load_module(libm, &mut reg);
        assert!(matches!(result, Err(RegistryError::ModuleMissingEntryPoint(ref p)) if p == libm));
        assert!(reg.is_empty());
    }

    extern "C" fn noop_draw(_t: c_long, _api: *const XlbHostApi, _cls: *mut c_void) {}

    struct Shared(XlbPlugin);
    // SAFETY: only pointers to static strings and no mutable state
    unsafe impl Sync for Shared {}

    static CLOUDS: Shared = Shared(XlbPlugin {
        name: c"clouds".as_ptr() as *const c_char,
        desc: c"drifting clouds".as_ptr() as *const c_char,
        props: ptr::null(),
        upd_interval: 50_000,
        init: None,
        cleanup: None,
        start: None,
        stop: None,
        draw: Some(noop_draw),
        prop: None,
        data: ptr::null_mut(),
    });

    extern "C" fn register_clouds(reg: *const XlbRegistrar) -> c_int {
        let reg = unsafe { &*reg };
        (reg.register_plugin)(reg.ctx, &CLOUDS.0)
    }

    extern "C" fn register_nothing(_reg: *const XlbRegistrar) -> c_int {
        0
    }

    #[test]
    fn test_register_entry_in_process() {
        let mut reg = PluginRegistry::new();
        assert_eq!(register_entry(&mut reg, register_clouds, None).unwrap(), 1);
        let p = reg.by_name("clouds").unwrap();
        assert_eq!(p.description(), "drifting clouds");
        assert_eq!(p.upd_interval_usec(), 50_000);
        assert!(!p.is_dynamic());

        // same module again is a duplicate, nothing new registered
        assert_eq!(register_entry(&mut reg, register_clouds, None).unwrap(), 0);
        assert_eq!(reg.count(), 1);
    }

    #[test]
    fn test_entry_registering_nothing() {
        let mut reg = PluginRegistry::new();
        let result = register_entry(&mut reg, register_nothing, None);
        assert!(matches!(result, Err(RegistryError::ModuleMissingEntryPoint(_))));
    }
}
