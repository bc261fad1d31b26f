/*
 *  store/value.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Typed attribute values held by the configuration tree
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

use std::fmt;

/// Maximum number of components in a vector value
pub const MAX_VECTOR_LEN: usize = 4;

/// Fixed capacity vector of up to four numbers (colours, directions, ranges)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigVector {
    elems: [f64; MAX_VECTOR_LEN],
    len: usize,
}

impl ConfigVector {
    /// Build from a slice, keeping at most four components
    pub fn new(values: &[f64]) -> Self {
        let len = values.len().min(MAX_VECTOR_LEN);
        let mut elems = [0.0; MAX_VECTOR_LEN];
        elems[..len].copy_from_slice(&values[..len]);
        Self { elems, len }
    }

    /// Components as a zero padded array
    pub fn as_array(&self) -> [f64; MAX_VECTOR_LEN] {
        self.elems
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.elems[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl From<[f64; 4]> for ConfigVector {
    fn from(v: [f64; 4]) -> Self {
        Self::new(&v)
    }
}

impl From<[f64; 2]> for ConfigVector {
    fn from(v: [f64; 2]) -> Self {
        Self::new(&v)
    }
}

/// A single attribute value.
///
/// Values are replaced wholesale on write; readers always get a copy.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Number(f64),
    Integer(i64),
    Vector(ConfigVector),
}

impl ConfigValue {
    /// Short name of the value kind, used in log output and the control channel
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Number(_) => "number",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Vector(_) => "vector",
        }
    }

    /// Interpret free-form text typed by a user or sent over the control socket.
    ///
    /// `[a, b, c]` is a vector, integer literals are integers, anything else
    /// that parses as a float is a number. Everything else is a string, with
    /// surrounding double quotes stripped.
    pub fn from_text(text: &str) -> ConfigValue {
        let text = text.trim();

        if let Some(inner) = text.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let parsed: Result<Vec<f64>, _> = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<f64>)
                .collect();
            if let Ok(values) = parsed {
                if !values.is_empty() && values.len() <= MAX_VECTOR_LEN {
                    return ConfigValue::Vector(ConfigVector::new(&values));
                }
            }
        }

        if let Ok(i) = text.parse::<i64>() {
            return ConfigValue::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return ConfigValue::Number(f);
        }

        let unquoted = text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(text);
        ConfigValue::String(unquoted.to_string())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Vector(v) => {
                write!(f, "[")?;
                for (i, c) in v.as_slice().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Number(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Integer(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::String(v)
    }
}

impl From<ConfigVector> for ConfigValue {
    fn from(v: ConfigVector) -> Self {
        ConfigValue::Vector(v)
    }
}

impl From<[f64; 4]> for ConfigValue {
    fn from(v: [f64; 4]) -> Self {
        ConfigValue::Vector(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_truncates_to_four() {
        let v = ConfigVector::new(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(v.len(), 4);
        assert_eq!(v.as_array(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_vector_zero_padding() {
        let v = ConfigVector::new(&[0.5, -1.0]);
        assert_eq!(v.as_slice(), &[0.5, -1.0]);
        assert_eq!(v.as_array(), [0.5, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_text() {
        assert_eq!(ConfigValue::from_text("42"), ConfigValue::Integer(42));
        assert_eq!(ConfigValue::from_text(" 0.25 "), ConfigValue::Number(0.25));
        assert_eq!(
            ConfigValue::from_text("[1, 0.5, 0]"),
            ConfigValue::Vector(ConfigVector::new(&[1.0, 0.5, 0.0]))
        );
        assert_eq!(ConfigValue::from_text("crop"), ConfigValue::String("crop".into()));
        assert_eq!(
            ConfigValue::from_text("\"/usr/share/bg.jpg\""),
            ConfigValue::String("/usr/share/bg.jpg".into())
        );
        // too many components is not a vector
        assert_eq!(
            ConfigValue::from_text("[1,2,3,4,5]"),
            ConfigValue::String("[1,2,3,4,5]".into())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ConfigValue::Number(0.05).to_string(), "0.05");
        assert_eq!(ConfigValue::from([1.0, 0.0, 0.5, 1.0]).to_string(), "[1, 0, 0.5, 1]");
    }
}
