/*
 *  store/node.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configuration tree node
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

use super::error::ConfigError;
use super::value::ConfigValue;

/// Named attribute on a node
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigAttr {
    pub name: String,
    pub value: ConfigValue,
}

/// A node in the configuration tree.
///
/// Attribute names and child names are each unique within a node. Growth
/// goes through `try_reserve` so an allocation failure surfaces as
/// `ConfigError::AllocationFailed` with the node unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    name: String,
    attrs: Vec<ConfigAttr>,
    children: Vec<ConfigNode>,
}

fn try_string(s: &str) -> Result<String, ConfigError> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| ConfigError::AllocationFailed)?;
    out.push_str(s);
    Ok(out)
}

impl ConfigNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Fallible constructor used on the create-on-write path
    pub fn try_new(name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: try_string(name)?,
            attrs: Vec::new(),
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&ConfigValue> {
        self.attrs.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn attrs(&self) -> impl Iterator<Item = &ConfigAttr> {
        self.attrs.iter()
    }

    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ConfigNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn children(&self) -> impl Iterator<Item = &ConfigNode> {
        self.children.iter()
    }

    /// Return the named child, creating an empty one if it is missing
    pub fn touch_child(&mut self, name: &str) -> Result<&mut ConfigNode, ConfigError> {
        match self.children.iter().position(|c| c.name == name) {
            Some(idx) => Ok(&mut self.children[idx]),
            None => self.add_child(ConfigNode::try_new(name)?),
        }
    }

    /// Append a child node. A child with the same name is replaced.
    pub fn add_child(&mut self, child: ConfigNode) -> Result<&mut ConfigNode, ConfigError> {
        if let Some(idx) = self.children.iter().position(|c| c.name == child.name) {
            self.children[idx] = child;
            return Ok(&mut self.children[idx]);
        }
        self.children
            .try_reserve(1)
            .map_err(|_| ConfigError::AllocationFailed)?;
        self.children.push(child);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Create or overwrite an attribute
    pub fn set_attr(&mut self, name: &str, value: ConfigValue) -> Result<(), ConfigError> {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
            return Ok(());
        }
        let name = try_string(name)?;
        self.attrs
            .try_reserve(1)
            .map_err(|_| ConfigError::AllocationFailed)?;
        self.attrs.push(ConfigAttr { name, value });
        Ok(())
    }

    /// Number of nodes in this subtree, this node included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ConfigNode::node_count).sum::<usize>()
    }

    /// Number of attributes in this subtree
    pub fn attr_count(&self) -> usize {
        self.attrs.len() + self.children.iter().map(ConfigNode::attr_count).sum::<usize>()
    }
}
