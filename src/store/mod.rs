/*
 *  store/mod.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Hierarchical configuration tree with path addressed access
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

//! Configuration store
//!
//! Values live in a tree rooted at `xlivebg` and are addressed with dotted
//! paths, `xlivebg.<node>...<attribute>`. Writes create any missing
//! intermediate nodes ("touch"). Reads never fail: a missing path, a store
//! that was never initialized, or a value of the wrong kind all yield the
//! caller's default.
//!
//! Every successful write is journaled; the host drains the journal with
//! [`ConfigStore::take_changes`] and hands each path to the change notifier.

pub mod codec;
pub mod error;
pub mod node;
pub mod value;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

pub use codec::{TreeCodec, YamlCodec};
pub use error::ConfigError;
pub use node::{ConfigAttr, ConfigNode};
pub use value::{ConfigValue, ConfigVector, MAX_VECTOR_LEN};

use crate::constants::ROOT_NAME;

/// Split a config path into its node chain and attribute name.
///
/// The first segment must be the root name and be followed by at least the
/// attribute segment. Empty segments are rejected.
pub fn split_path(path: &str) -> Result<(Vec<&str>, &str), ConfigError> {
    let mut segs: Vec<&str> = path.split('.').collect();

    if segs.len() < 2 || segs[0] != ROOT_NAME || segs.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }

    let attr = segs.pop().ok_or_else(|| ConfigError::InvalidPath(path.to_string()))?;
    segs.remove(0);
    Ok((segs, attr))
}

/// Default save target when the store was not loaded from a file
pub fn default_save_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config/xlivebg/config.yaml"))
}

pub struct ConfigStore {
    root: Option<ConfigNode>,
    origin: Option<PathBuf>,
    changes: Vec<String>,
    codec: Box<dyn TreeCodec>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("root", &self.root)
            .field("origin", &self.origin)
            .field("pending_changes", &self.changes.len())
            .finish()
    }
}

impl ConfigStore {
    /// Empty store; the root node is created on the first write
    pub fn new() -> Self {
        Self::with_codec(Box::new(YamlCodec))
    }

    pub fn with_codec(codec: Box<dyn TreeCodec>) -> Self {
        Self {
            root: None,
            origin: None,
            changes: Vec::new(),
            codec,
        }
    }

    /// Parse a serialized tree. The root node must be named `xlivebg`.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        let root = self.codec.parse(bytes)?;
        if root.name() != ROOT_NAME {
            return Err(ConfigError::Schema(root.name().to_string()));
        }
        self.root = Some(root);
        self.changes.clear();
        Ok(())
    }

    /// Load a config file and remember it as the default save target
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let bytes = fs::read(path)?;
        self.load_bytes(&bytes)?;
        self.origin = Some(path.to_path_buf());
        info!("Using config file: {}", path.display());
        Ok(())
    }

    /// Encode the tree with the store's codec. An empty store encodes as a
    /// bare root node.
    pub fn serialize(&self) -> Result<Vec<u8>, ConfigError> {
        match &self.root {
            Some(root) => self.codec.serialize(root),
            None => self.codec.serialize(&ConfigNode::new(ROOT_NAME)),
        }
    }

    /// Serialize the tree to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let bytes = self.serialize()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, bytes)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Save to the file the store was loaded from, or the per-user default
    pub fn save_default(&self) -> Result<PathBuf, ConfigError> {
        let path = self
            .origin
            .clone()
            .or_else(default_save_path)
            .ok_or(ConfigError::NoSavePath)?;
        self.save(&path)?;
        Ok(path)
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn root(&self) -> Option<&ConfigNode> {
        self.root.as_ref()
    }

    fn find(&self, path: &str) -> Option<&ConfigValue> {
        let (nodes, attr) = split_path(path).ok()?;
        let mut node = self.root.as_ref()?;
        for seg in nodes {
            node = node.child(seg)?;
        }
        node.attr(attr)
    }

    /// Exact path lookup
    pub fn lookup(&self, path: &str) -> Option<ConfigValue> {
        self.find(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    pub fn number(&self, path: &str, default: f64) -> f64 {
        match self.find(path) {
            Some(ConfigValue::Number(n)) => *n,
            Some(ConfigValue::Integer(i)) => *i as f64,
            _ => default,
        }
    }

    pub fn integer(&self, path: &str, default: i64) -> i64 {
        match self.find(path) {
            Some(ConfigValue::Integer(i)) => *i,
            Some(ConfigValue::Number(n)) => *n as i64,
            _ => default,
        }
    }

    pub fn string<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        match self.find(path) {
            Some(ConfigValue::String(s)) => s.as_str(),
            _ => default,
        }
    }

    pub fn vector(&self, path: &str, default: [f64; MAX_VECTOR_LEN]) -> [f64; MAX_VECTOR_LEN] {
        match self.find(path) {
            Some(ConfigValue::Vector(v)) => v.as_array(),
            _ => default,
        }
    }

    /// Create-on-write. Missing intermediate nodes and the attribute itself
    /// are created; an existing attribute is overwritten.
    pub fn set(&mut self, path: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let (nodes, attr) = split_path(path)?;

        if self.root.is_none() {
            self.root = Some(ConfigNode::try_new(ROOT_NAME)?);
        }
        let Some(mut node) = self.root.as_mut() else {
            return Err(ConfigError::AllocationFailed);
        };

        for seg in nodes {
            node = node.touch_child(seg)?;
        }
        node.set_attr(attr, value)?;

        debug!("config: {} updated", path);
        self.changes.push(path.to_string());
        Ok(())
    }

    /// Write only if the attribute does not exist yet. Returns whether a write happened.
    pub fn set_default(&mut self, path: &str, value: ConfigValue) -> Result<bool, ConfigError> {
        split_path(path)?;
        if self.contains(path) {
            return Ok(false);
        }
        self.set(path, value)?;
        Ok(true)
    }

    /// Drain the paths written since the last call, oldest first
    pub fn take_changes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Total number of attributes in the tree
    pub fn attribute_count(&self) -> usize {
        self.root.as_ref().map_or(0, ConfigNode::attr_count)
    }

    /// Total number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, ConfigNode::node_count)
    }
}
