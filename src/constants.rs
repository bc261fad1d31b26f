//! This module contains global constants used across the host, store and plugin modules.

/// Name of the configuration tree root, and first segment of every config path.
pub const ROOT_NAME: &str = "xlivebg";

// host-wide config attributes
/// Name of the background to activate at startup.
pub const CFG_ACTIVE: &str = "xlivebg.active";
/// Background image path.
pub const CFG_IMAGE: &str = "xlivebg.image";
/// Animation mask image path.
pub const CFG_ANIM_MASK: &str = "xlivebg.anim_mask";
/// Primary fill colour (RGBA).
pub const CFG_COLOR: &str = "xlivebg.color";
/// Secondary fill colour, used by the gradient modes.
pub const CFG_COLOR2: &str = "xlivebg.color2";
/// Background fill mode: solid | vgrad | hgrad.
pub const CFG_BGMODE: &str = "xlivebg.bgmode";
/// Frame rate override, <= 0 leaves the plugin's own interval in charge.
pub const CFG_FPS: &str = "xlivebg.fps";
/// Image fit mode: full | crop | stretch.
pub const CFG_FIT: &str = "xlivebg.fit";
/// Crop zoom blend factor.
pub const CFG_CROP_ZOOM: &str = "xlivebg.crop_zoom";
/// Crop pan direction.
pub const CFG_CROP_DIR: &str = "xlivebg.crop_dir";

/// Installation prefix used for the system-wide plugin directory.
pub const PREFIX: &str = match option_env!("XLIVEBG_PREFIX") {
    Some(p) => p,
    None => "/usr/local",
};

/// Environment variable naming an extra plugin directory, scanned first.
pub const PLUGIN_PATH_ENV: &str = "XLIVEBG_PLUGIN_PATH";

/// Exported symbol every plugin module must provide.
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"register_plugin\0";

/// Frame interval used when neither the plugin nor the config asks for one (30 Hz).
pub const DEFAULT_FRAME_INTERVAL_USEC: u64 = 33_333;

/// Shortest frame interval the draw loop will pace to (1000 Hz).
pub const MIN_FRAME_INTERVAL_USEC: u64 = 1_000;

/// Common frame intervals for plugin descriptors, in microseconds.
pub const FPS_25_USEC: u64 = 1_000_000 / 25;
pub const FPS_30_USEC: u64 = 1_000_000 / 30;
pub const FPS_60_USEC: u64 = 1_000_000 / 60;

/// Control socket file name, placed in the runtime directory.
pub const CONTROL_SOCKET_NAME: &str = "xlivebg.sock";
