/*
 *  store/error.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error type for the configuration tree
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

use thiserror::Error;

/// Error type for configuration tree access, load and save.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Path does not start with the root segment, has an empty segment,
    /// or names no attribute
    #[error("invalid config path: \"{0}\"")]
    InvalidPath(String),

    /// Growing the tree failed; the tree is left as it was
    #[error("out of memory while growing the config tree")]
    AllocationFailed,

    /// Malformed config file
    #[error("config parse error: {0}")]
    Parse(String),

    /// Well-formed file with the wrong root node
    #[error("invalid or corrupted config file, root node is \"{0}\" instead of \"xlivebg\"")]
    Schema(String),

    /// A node holds an attribute and a child under the same name, which the
    /// file format cannot tell apart
    #[error("\"{0}\" is both a setting and a section, cannot save")]
    NameClash(String),

    /// Nowhere to save to
    #[error("no config file path available")]
    NoSavePath,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
