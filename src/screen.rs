/*
 *  screen.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen geometry and image metadata
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
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScreenError {
    #[error("invalid screen geometry \"{0}\", expected WxH[+X+Y]")]
    BadGeometry(String),
}

/// One physical screen, as reported by the window system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenDescriptor {
    pub width: i32,
    pub height: i32,
    /// x, y, width, height
    pub viewport: [i32; 4],
}

impl ScreenDescriptor {
    pub fn new(width: i32, height: i32) -> Self {
        Self::at(width, height, 0, 0)
    }

    pub fn at(width: i32, height: i32, x: i32, y: i32) -> Self {
        Self {
            width,
            height,
            viewport: [x, y, width, height],
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height <= 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

impl Default for ScreenDescriptor {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for ScreenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.viewport[0], self.viewport[1]
        )
    }
}

impl FromStr for ScreenDescriptor {
    type Err = ScreenError;

    /// Parses X11 style geometry, `1920x1080` or `1920x1080+1920+0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ScreenError::BadGeometry(s.to_string());

        let (size, offset) = match s.find('+') {
            Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
            None => (s, None),
        };

        let (w, h) = size.split_once(['x', 'X']).ok_or_else(bad)?;
        let width: i32 = w.trim().parse().map_err(|_| bad())?;
        let height: i32 = h.trim().parse().map_err(|_| bad())?;
        if width <= 0 || height <= 0 {
            return Err(bad());
        }

        let (x, y) = match offset {
            Some(off) => {
                let (x, y) = off.split_once('+').ok_or_else(bad)?;
                (
                    x.trim().parse().map_err(|_| bad())?,
                    y.trim().parse().map_err(|_| bad())?,
                )
            }
            None => (0, 0),
        };

        Ok(Self::at(width, height, x, y))
    }
}

/// Metadata for an uploaded image. Pixels live with the embedder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageInfo {
    pub width: i32,
    pub height: i32,
    /// texture name, 0 if not uploaded
    pub texture: u32,
}

impl ImageInfo {
    pub fn aspect(&self) -> f32 {
        if self.height <= 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_only() {
        let s: ScreenDescriptor = "1920x1080".parse().unwrap();
        assert_eq!(s.width, 1920);
        assert_eq!(s.height, 1080);
        assert_eq!(s.viewport, [0, 0, 1920, 1080]);
    }

    #[test]
    fn test_parse_with_offset() {
        let s: ScreenDescriptor = "1280x1024+1920+56".parse().unwrap();
        assert_eq!(s.viewport, [1920, 56, 1280, 1024]);
        assert_eq!(s.to_string(), "1280x1024+1920+56");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ScreenDescriptor>().is_err());
        assert!("1920".parse::<ScreenDescriptor>().is_err());
        assert!("0x1080".parse::<ScreenDescriptor>().is_err());
        assert!("1920x1080+5".parse::<ScreenDescriptor>().is_err());
        assert!("axb".parse::<ScreenDescriptor>().is_err());
    }

    #[test]
    fn test_aspect() {
        assert_eq!(ScreenDescriptor::new(2000, 1000).aspect(), 2.0);
        let img = ImageInfo { width: 512, height: 512, texture: 0 };
        assert_eq!(img.aspect(), 1.0);
    }
}
