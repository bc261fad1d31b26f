/*
 *  store/codec.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  On-disk representation of the configuration tree
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

//! Tree serialization.
//!
//! The store only relies on the `TreeCodec` contract; `YamlCodec` is the
//! format the host ships with:
//!
//! ```yaml
//! xlivebg:
//!   active: distort
//!   fit: crop
//!   crop_dir: [0.0, -0.5]
//!   distort:
//!     amplitude: 0.025
//!     frequency: 8
//! ```
//!
//! Mappings are child nodes, scalars are attributes and numeric sequences of
//! up to four items are vectors.

use serde_yaml::{Mapping, Value};

use super::error::ConfigError;
use super::node::ConfigNode;
use super::value::{ConfigValue, ConfigVector, MAX_VECTOR_LEN};

/// Serialization collaborator for the config tree
pub trait TreeCodec {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigNode, ConfigError>;
    fn serialize(&self, root: &ConfigNode) -> Result<Vec<u8>, ConfigError>;
}

/// YAML tree format
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl TreeCodec for YamlCodec {
    fn parse(&self, bytes: &[u8]) -> Result<ConfigNode, ConfigError> {
        let doc: Value = serde_yaml::from_slice(bytes)?;

        let top = match doc {
            Value::Mapping(m) => m,
            Value::Null => return Err(ConfigError::Parse("empty config document".into())),
            _ => return Err(ConfigError::Parse("top level must be a mapping".into())),
        };

        if top.len() != 1 {
            return Err(ConfigError::Parse(format!(
                "expected a single root node, found {}",
                top.len()
            )));
        }

        let (key, body) = top
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::Parse("missing root node".into()))?;
        let name = key_name(&key)?;
        node_from_value(&name, body)
    }

    fn serialize(&self, root: &ConfigNode) -> Result<Vec<u8>, ConfigError> {
        let mut top = Mapping::new();
        top.insert(Value::String(root.name().to_string()), node_to_value(root, root.name())?);
        let text = serde_yaml::to_string(&Value::Mapping(top))?;
        Ok(text.into_bytes())
    }
}

fn key_name(key: &Value) -> Result<String, ConfigError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ConfigError::Parse(format!("unsupported key: {:?}", key))),
    }
}

fn node_from_value(name: &str, body: Value) -> Result<ConfigNode, ConfigError> {
    let mut node = ConfigNode::try_new(name)?;

    let map = match body {
        Value::Mapping(m) => m,
        Value::Null => return Ok(node),
        other => {
            return Err(ConfigError::Parse(format!(
                "node \"{}\" must be a mapping, found {:?}",
                name, other
            )))
        }
    };

    for (key, value) in map {
        let key = key_name(&key)?;
        match value {
            Value::Mapping(_) | Value::Null => {
                let child = node_from_value(&key, value)?;
                node.add_child(child)?;
            }
            other => {
                let attr = value_from_yaml(&key, other)?;
                node.set_attr(&key, attr)?;
            }
        }
    }

    Ok(node)
}

fn value_from_yaml(name: &str, value: Value) -> Result<ConfigValue, ConfigError> {
    match value {
        Value::String(s) => Ok(ConfigValue::String(s)),
        Value::Bool(b) => Ok(ConfigValue::Integer(b as i64)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ConfigValue::Integer(i))
            } else {
                n.as_f64()
                    .map(ConfigValue::Number)
                    .ok_or_else(|| ConfigError::Parse(format!("bad number for \"{}\"", name)))
            }
        }
        Value::Sequence(seq) => {
            if seq.len() > MAX_VECTOR_LEN {
                return Err(ConfigError::Parse(format!(
                    "vector \"{}\" must have at most {} components",
                    name, MAX_VECTOR_LEN
                )));
            }
            let comps = seq
                .iter()
                .map(|v| v.as_f64())
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| {
                    ConfigError::Parse(format!("vector \"{}\" has non-numeric components", name))
                })?;
            Ok(ConfigValue::Vector(ConfigVector::new(&comps)))
        }
        other => Err(ConfigError::Parse(format!(
            "unsupported value for \"{}\": {:?}",
            name, other
        ))),
    }
}

/// `path` is the dotted path of `node`, used in the clash error
fn node_to_value(node: &ConfigNode, path: &str) -> Result<Value, ConfigError> {
    let mut map = Mapping::new();

    for attr in node.attrs() {
        let v = match &attr.value {
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Number(n) => Value::Number((*n).into()),
            ConfigValue::Integer(i) => Value::Number((*i).into()),
            ConfigValue::Vector(vec) => Value::Sequence(
                vec.as_slice().iter().map(|c| Value::Number((*c).into())).collect(),
            ),
        };
        map.insert(Value::String(attr.name.clone()), v);
    }

    for child in node.children() {
        let child_path = format!("{}.{}", path, child.name());
        let key = Value::String(child.name().to_string());
        if map.contains_key(&key) {
            return Err(ConfigError::NameClash(child_path));
        }
        map.insert(key, node_to_value(child, &child_path)?);
    }

    Ok(Value::Mapping(map))
}
