/*
 *  host_integration.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host lifecycle, notification and control tests
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

use std::cell::RefCell;
use std::ffi::{c_char, c_int, c_long, c_void, CStr};
use std::ptr;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use xlivebg::activation::ActivationError;
use xlivebg::api::{HostApi, HostEnv};
use xlivebg::constants::{CFG_ACTIVE, CFG_CROP_ZOOM, CFG_FIT, FPS_25_USEC};
use xlivebg::control::{self, ControlCommand, ControlReply};
use xlivebg::host::Host;
use xlivebg::plugin::{Hook, PluginDescriptor, PluginError, PluginHooks, XlbHostApi, XlbPlugin, XlbRegistrar};
use xlivebg::render::{HeadlessBackend, MockBackend};
use xlivebg::screen::ScreenDescriptor;
use xlivebg::store::{ConfigStore, ConfigValue};

const WAVE_PROPS: &str = r#"
proplist {
    prop {
        id = "frequency"
        desc = "frequency of the waves"
        type = "number"
        range = [0, 50]
    }
    prop {
        id = "amplitude"
        desc = "amplitude of the waves"
        type = "number"
        range = [0, 0.1]
    }
}
"#;

#[derive(Debug, Default)]
struct Calls {
    init: u32,
    start: u32,
    stop: u32,
    draw: u32,
    cleanup: u32,
    props: Vec<String>,
    in_hook: bool,
    reentered: bool,
}

type Shared = Rc<RefCell<Calls>>;

/// Plugin that records every hook call
#[derive(Default)]
struct Recorder {
    calls: Shared,
    prop_hook: bool,
    fail_init: bool,
    /// written from `init` with set_default
    init_default: Option<(&'static str, ConfigValue)>,
    /// written from `start`
    start_write: Option<(&'static str, ConfigValue)>,
    /// written from `property_changed` when the first id arrives
    prop_write: Option<(&'static str, ConfigValue)>,
    /// written from `draw`
    draw_write: Option<(&'static str, ConfigValue)>,
}

impl Recorder {
    fn enter(&self) {
        let mut c = self.calls.borrow_mut();
        if c.in_hook {
            c.reentered = true;
        }
        c.in_hook = true;
    }

    fn leave(&self) {
        self.calls.borrow_mut().in_hook = false;
    }
}

impl PluginHooks for Recorder {
    fn provides(&self, hook: Hook) -> bool {
        match hook {
            Hook::PropertyChanged => self.prop_hook,
            _ => true,
        }
    }

    fn init(&mut self, host: &mut HostApi<'_>) -> Result<(), PluginError> {
        self.calls.borrow_mut().init += 1;
        if self.fail_init {
            return Err(PluginError::HookFailed("no GPU".into()));
        }
        if let Some((path, value)) = self.init_default.clone() {
            host.set_default(path, value).map_err(|e| PluginError::HookFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.calls.borrow_mut().cleanup += 1;
    }

    fn start(&mut self, _msec: u64, host: &mut HostApi<'_>) -> Result<(), PluginError> {
        self.enter();
        self.calls.borrow_mut().start += 1;
        if let Some((path, value)) = self.start_write.clone() {
            host.set(path, value).map_err(|e| PluginError::HookFailed(e.to_string()))?;
        }
        self.leave();
        Ok(())
    }

    fn stop(&mut self, _host: &mut HostApi<'_>) {
        self.enter();
        self.calls.borrow_mut().stop += 1;
        self.leave();
    }

    fn draw(&mut self, _msec: u64, host: &mut HostApi<'_>) {
        self.enter();
        self.calls.borrow_mut().draw += 1;
        if let Some((path, value)) = self.draw_write.clone() {
            let _ = host.set(path, value);
        }
        self.leave();
    }

    fn property_changed(&mut self, id: &str, host: &mut HostApi<'_>) {
        self.enter();
        let first = {
            let mut c = self.calls.borrow_mut();
            c.props.push(id.to_string());
            c.props.len() == 1
        };
        if first {
            if let Some((path, value)) = self.prop_write.clone() {
                let _ = host.set(path, value);
            }
        }
        self.leave();
    }
}

fn headless_host() -> Host {
    Host::new(ConfigStore::new(), HostEnv::default(), Box::new(HeadlessBackend::new()))
}

fn add(host: &mut Host, name: &str, props: &str, hooks: Recorder) -> usize {
    host.register(PluginDescriptor::new(name, "test plugin", props, 0, Box::new(hooks)))
        .unwrap()
}

fn recorder(calls: &Shared) -> Recorder {
    Recorder {
        calls: calls.clone(),
        ..Recorder::default()
    }
}

#[test]
fn test_activation_exclusivity() {
    let (a, b) = (Shared::default(), Shared::default());
    let mut host = headless_host();
    let ia = add(&mut host, "a", "", recorder(&a));
    let ib = add(&mut host, "b", "", recorder(&b));

    host.activate(ia).unwrap();
    host.activate(ib).unwrap();

    assert_eq!(a.borrow().start, 1);
    assert_eq!(a.borrow().stop, 1);
    assert_eq!(b.borrow().start, 1);
    assert_eq!(b.borrow().stop, 0);
    assert_eq!(host.active().unwrap().name(), "b");
}

#[test]
fn test_restart_fallback_without_property_list() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(&mut host, "plain", "", Recorder { prop_hook: true, ..recorder(&calls) });
    host.activate(idx).unwrap();

    host.set_config("xlivebg.plain.speed", ConfigValue::Number(2.0)).unwrap();

    let c = calls.borrow();
    assert_eq!(c.stop, 1);
    assert_eq!(c.start, 2);
    assert!(c.props.is_empty());
}

#[test]
fn test_restart_fallback_without_property_hook() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(&mut host, "waves", WAVE_PROPS, recorder(&calls));
    host.activate(idx).unwrap();

    host.set_config("xlivebg.waves.frequency", ConfigValue::Number(9.0)).unwrap();

    assert_eq!(calls.borrow().stop, 1);
    assert!(calls.borrow().props.is_empty());
}

#[test]
fn test_targeted_notification() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(&mut host, "waves", WAVE_PROPS, Recorder { prop_hook: true, ..recorder(&calls) });
    host.activate(idx).unwrap();

    host.set_config("xlivebg.waves.frequency", ConfigValue::Number(12.0)).unwrap();
    {
        let c = calls.borrow();
        assert_eq!(c.props, vec!["frequency"]);
        assert_eq!(c.stop, 0);
        assert_eq!(c.start, 1);
    }

    // other namespaces, host globals and undeclared ids do nothing
    host.set_config("xlivebg.stars.frequency", ConfigValue::Number(1.0)).unwrap();
    host.set_config(CFG_FIT, "crop".into()).unwrap();
    host.set_config("xlivebg.waves.colour", "blue".into()).unwrap();

    let c = calls.borrow();
    assert_eq!(c.props, vec!["frequency"]);
    assert_eq!(c.stop, 0);
    assert_eq!(c.start, 1);
}

#[test]
fn test_nothing_notified_while_idle() {
    let calls = Shared::default();
    let mut host = headless_host();
    add(&mut host, "waves", WAVE_PROPS, Recorder { prop_hook: true, ..recorder(&calls) });

    host.set_config("xlivebg.waves.frequency", ConfigValue::Number(3.0)).unwrap();
    assert!(calls.borrow().props.is_empty());
    assert_eq!(host.config().number("xlivebg.waves.frequency", 0.0), 3.0);
}

#[test]
fn test_invalid_path_rejected_without_notification() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(&mut host, "plain", "", recorder(&calls));
    host.activate(idx).unwrap();

    assert!(host.set_config("notxlivebg.plain.speed", ConfigValue::Integer(1)).is_err());
    assert_eq!(host.config().attribute_count(), 0);
    assert_eq!(calls.borrow().stop, 0);
}

#[test]
fn test_render_failure_leaves_idle() {
    let calls = Shared::default();
    let backend = MockBackend::new();
    let state = backend.state();
    let mut host = Host::new(ConfigStore::new(), HostEnv::default(), Box::new(backend));
    let idx = add(&mut host, "a", "", recorder(&calls));

    state.borrow_mut().fail_create = true;
    let result = host.activate(idx);

    assert!(matches!(result, Err(ActivationError::RenderContextUnavailable(_))));
    assert!(host.active().is_none());
    assert_eq!(calls.borrow().start, 0);

    // recovers on the next attempt
    state.borrow_mut().fail_create = false;
    host.activate(idx).unwrap();
    assert_eq!(calls.borrow().start, 1);
    assert!(state.borrow().live);
}

#[test]
fn test_remove_active_plugin_deactivates_first() {
    let calls = Shared::default();
    let backend = MockBackend::new();
    let state = backend.state();
    let mut host = Host::new(ConfigStore::new(), HostEnv::default(), Box::new(backend));
    add(&mut host, "first", "", recorder(&Shared::default()));
    let idx = add(&mut host, "second", "", recorder(&calls));

    host.activate(idx).unwrap();
    host.remove_plugin(idx).unwrap();

    let c = calls.borrow();
    assert_eq!(c.stop, 1);
    assert_eq!(c.cleanup, 1);
    assert!(host.active().is_none());
    assert!(!state.borrow().live);
    assert_eq!(host.registry().count(), 1);
}

#[test]
fn test_init_failure_removes_plugin() {
    let (good, bad) = (Shared::default(), Shared::default());
    let mut host = headless_host();
    add(
        &mut host,
        "good",
        WAVE_PROPS,
        Recorder {
            init_default: Some(("xlivebg.good.frequency", ConfigValue::Number(5.0))),
            ..recorder(&good)
        },
    );
    add(&mut host, "bad", "", Recorder { fail_init: true, ..recorder(&bad) });

    host.init_plugins();

    assert_eq!(good.borrow().init, 1);
    assert_eq!(bad.borrow().init, 1);
    assert_eq!(bad.borrow().cleanup, 1);
    assert_eq!(host.registry().count(), 1);
    assert!(host.registry().by_name("bad").is_none());
    assert_eq!(host.config().number("xlivebg.good.frequency", 0.0), 5.0);
}

#[test]
fn test_init_default_keeps_user_value() {
    let calls = Shared::default();
    let mut store = ConfigStore::new();
    store.load_bytes(b"xlivebg:\n  good:\n    frequency: 20\n").unwrap();
    let mut host = Host::new(store, HostEnv::default(), Box::new(HeadlessBackend::new()));
    add(
        &mut host,
        "good",
        WAVE_PROPS,
        Recorder {
            init_default: Some(("xlivebg.good.frequency", ConfigValue::Number(5.0))),
            ..recorder(&calls)
        },
    );

    host.init_plugins();
    assert_eq!(host.config().integer("xlivebg.good.frequency", 0), 20);
}

#[test]
fn test_writes_from_hooks_are_deferred() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(
        &mut host,
        "waves",
        WAVE_PROPS,
        Recorder {
            prop_hook: true,
            prop_write: Some(("xlivebg.waves.amplitude", ConfigValue::Number(0.02))),
            ..recorder(&calls)
        },
    );
    host.activate(idx).unwrap();

    host.set_config("xlivebg.waves.frequency", ConfigValue::Number(7.0)).unwrap();

    let c = calls.borrow();
    assert_eq!(c.props, vec!["frequency", "amplitude"]);
    assert!(!c.reentered);
    assert_eq!(host.config().number("xlivebg.waves.amplitude", 0.0), 0.02);
}

#[test]
fn test_coarse_plugin_restarts_once_per_batch() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(
        &mut host,
        "plain",
        "",
        Recorder {
            start_write: Some(("xlivebg.plain.seed", ConfigValue::Integer(42))),
            ..recorder(&calls)
        },
    );

    // writes made while starting do not restart the plugin again
    host.activate(idx).unwrap();
    assert_eq!(calls.borrow().start, 1);
    assert_eq!(calls.borrow().stop, 0);

    host.set_config("xlivebg.plain.speed", ConfigValue::Number(1.0)).unwrap();
    let c = calls.borrow();
    assert_eq!(c.stop, 1);
    assert_eq!(c.start, 2);
    assert!(!c.reentered);
}

#[test]
fn test_draw_writes_dispatched_after_frame() {
    let calls = Shared::default();
    let mut host = headless_host();
    let idx = add(
        &mut host,
        "waves",
        WAVE_PROPS,
        Recorder {
            prop_hook: true,
            draw_write: Some(("xlivebg.waves.frequency", ConfigValue::Number(1.0))),
            ..recorder(&calls)
        },
    );
    host.activate(idx).unwrap();

    host.draw();
    host.draw();

    let c = calls.borrow();
    assert_eq!(c.draw, 2);
    assert_eq!(c.props, vec!["frequency", "frequency"]);
    assert!(!c.reentered);
}

#[test]
fn test_shutdown_and_drop() {
    let calls = Shared::default();
    {
        let mut host = headless_host();
        let idx = add(&mut host, "a", "", recorder(&calls));
        host.activate(idx).unwrap();
        host.shutdown();
        assert_eq!(calls.borrow().stop, 1);
    }
    let c = calls.borrow();
    assert_eq!(c.stop, 1);
    assert_eq!(c.cleanup, 1);
}

#[test]
fn test_image_projection_reads_config_per_call() {
    let env = HostEnv::new(vec![ScreenDescriptor::new(2000, 1000), ScreenDescriptor::at(1000, 1000, 2000, 0)]);
    let mut host = Host::new(ConfigStore::new(), env, Box::new(HeadlessBackend::new()));

    let m = host.image_projection(0, 1.0);
    assert_eq!((m[0], m[5]), (0.5, 1.0));

    host.set_config(CFG_FIT, "crop".into()).unwrap();
    host.set_config(CFG_CROP_ZOOM, ConfigValue::Number(1.0)).unwrap();
    let m = host.image_projection(0, 1.0);
    assert_eq!((m[0], m[5]), (1.0, 2.0));

    assert_eq!(host.image_projection(1, 1.0)[0], 1.0);
    assert_eq!(host.viewport(1), Some([2000, 0, 1000, 1000]));
    assert_eq!(host.viewport(2), None);
}

#[test]
fn test_control_commands() {
    let calls = Shared::default();
    let mut host = headless_host();
    add(&mut host, "waves", WAVE_PROPS, Recorder { prop_hook: true, ..recorder(&calls) });
    add(&mut host, "plain", "", recorder(&Shared::default()));

    let run = |host: &mut Host, line: &str| {
        let command: ControlCommand = line.parse().unwrap();
        control::execute(host, command)
    };

    assert_eq!(run(&mut host, "ping"), ControlReply::Text("pong".into()));
    assert_eq!(
        run(&mut host, "list"),
        ControlReply::Text(
            r#"[{"name":"waves","description":"test plugin"},{"name":"plain","description":"test plugin"}]"#.into()
        )
    );
    assert_eq!(run(&mut host, "active"), ControlReply::Text(String::new()));
    assert_eq!(run(&mut host, "props"), ControlReply::Text("[]".into()));

    assert_eq!(run(&mut host, "switch WAVES"), ControlReply::Ok);
    assert_eq!(run(&mut host, "active"), ControlReply::Text("waves".into()));
    assert_eq!(host.config().string(CFG_ACTIVE, ""), "waves");
    match run(&mut host, "props") {
        ControlReply::Text(json) => assert!(json.contains(r#""id":"frequency""#)),
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(run(&mut host, "set xlivebg.waves.amplitude 0.07"), ControlReply::Ok);
    assert_eq!(calls.borrow().props, vec!["amplitude"]);
    assert_eq!(run(&mut host, "get xlivebg.waves.amplitude"), ControlReply::Text("0.07".into()));

    assert!(matches!(run(&mut host, "get xlivebg.nothing"), ControlReply::Error(_)));
    assert!(matches!(run(&mut host, "switch nope"), ControlReply::Error(_)));
    assert!(matches!(run(&mut host, "set bogus 1"), ControlReply::Error(_)));
    assert_eq!(run(&mut host, "active"), ControlReply::Text("waves".into()));
}

#[test]
fn test_fps_from_plugin_interval() {
    let mut host = headless_host();
    let idx = host
        .register(PluginDescriptor::new("slow", "", "", FPS_25_USEC, Box::new(recorder(&Shared::default()))))
        .unwrap();
    host.activate(idx).unwrap();
    assert_eq!(host.frame_interval_usec(), 40_000);
}

// ---- a plugin speaking the C ABI, linked into the test binary ----

static C_INIT: AtomicU32 = AtomicU32::new(0);
static C_START: AtomicU32 = AtomicU32::new(0);
static C_STOP: AtomicU32 = AtomicU32::new(0);
static C_PROP: AtomicU32 = AtomicU32::new(0);
static C_LAST_SPEED: AtomicU32 = AtomicU32::new(0);

extern "C" fn c_init(api: *const XlbHostApi, _cls: *mut c_void) -> c_int {
    let api = unsafe { &*api };
    C_INIT.fetch_add(1, Ordering::SeqCst);
    (api.defcfg_num)(api.ctx, c"xlivebg.ctide.speed".as_ptr(), 2.5)
}

extern "C" fn c_start(_t: c_long, _api: *const XlbHostApi, _cls: *mut c_void) -> c_int {
    C_START.fetch_add(1, Ordering::SeqCst);
    0
}

extern "C" fn c_stop(_api: *const XlbHostApi, _cls: *mut c_void) {
    C_STOP.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn c_draw(_t: c_long, api: *const XlbHostApi, _cls: *mut c_void) {
    let api = unsafe { &*api };
    let speed = (api.getcfg_num)(api.ctx, c"xlivebg.ctide.speed".as_ptr(), 0.0);
    C_LAST_SPEED.store(speed.to_bits(), Ordering::SeqCst);
}

extern "C" fn c_prop(id: *const c_char, _api: *const XlbHostApi, _cls: *mut c_void) {
    let id = unsafe { CStr::from_ptr(id) };
    if id.to_bytes() == b"speed" {
        C_PROP.fetch_add(1, Ordering::SeqCst);
    }
}

struct SyncPlugin(XlbPlugin);
// SAFETY: static strings and function pointers only
unsafe impl Sync for SyncPlugin {}

static CTIDE: SyncPlugin = SyncPlugin(XlbPlugin {
    name: c"ctide".as_ptr(),
    desc: c"tides through the C interface".as_ptr(),
    props: c"proplist { prop { id = \"speed\" desc = \"tide speed\" type = \"number\" } }".as_ptr(),
    upd_interval: 20_000,
    init: Some(c_init),
    cleanup: None,
    start: Some(c_start),
    stop: Some(c_stop),
    draw: Some(c_draw),
    prop: Some(c_prop),
    data: ptr::null_mut(),
});

extern "C" fn register_ctide(reg: *const XlbRegistrar) -> c_int {
    let reg = unsafe { &*reg };
    (reg.register_plugin)(reg.ctx, &CTIDE.0)
}

#[test]
fn test_c_abi_plugin_lifecycle() {
    let mut host = headless_host();
    assert_eq!(host.register_entry(register_ctide).unwrap(), 1);

    let p = host.registry().by_name("ctide").unwrap();
    assert_eq!(p.description(), "tides through the C interface");
    assert!(p.property("speed").is_some());
    assert!(!p.provides(Hook::Cleanup));

    host.init_plugins();
    assert_eq!(C_INIT.load(Ordering::SeqCst), 1);
    assert_eq!(host.config().number("xlivebg.ctide.speed", 0.0), 2.5);

    host.activate_by_name("ctide").unwrap();
    assert_eq!(C_START.load(Ordering::SeqCst), 1);
    assert_eq!(host.frame_interval_usec(), 20_000);

    host.draw();
    assert_eq!(f32::from_bits(C_LAST_SPEED.load(Ordering::SeqCst)), 2.5);

    host.set_config("xlivebg.ctide.speed", ConfigValue::Number(4.0)).unwrap();
    assert_eq!(C_PROP.load(Ordering::SeqCst), 1);
    assert_eq!(C_STOP.load(Ordering::SeqCst), 0);

    host.draw();
    assert_eq!(f32::from_bits(C_LAST_SPEED.load(Ordering::SeqCst)), 4.0);

    host.deactivate();
    assert_eq!(C_STOP.load(Ordering::SeqCst), 1);
}
