/*
 *  pacer.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame pacing for the draw loop
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
use std::time::{Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

impl Pacer {
    pub fn new(interval_usec: u64) -> Self {
        Self {
            next_deadline: Instant::now(),
            frame: Duration::from_micros(interval_usec.max(1)),
        }
    }

    #[inline]
    pub fn set_interval(&mut self, interval_usec: u64) {
        self.frame = Duration::from_micros(interval_usec.max(1));
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.frame
    }

    /// Time left until the next frame is due
    #[inline]
    pub fn until_next(&self) -> Duration {
        self.next_deadline.saturating_duration_since(Instant::now())
    }

    /// Returns true if a frame is due; if true, it also schedules the next deadline.
    #[inline]
    pub fn should_draw(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.next_deadline {
            self.next_deadline = now + self.frame;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_due_immediately() {
        let mut p = Pacer::new(1_000_000);
        assert!(p.should_draw());
        assert!(!p.should_draw());
        assert!(p.until_next() > Duration::from_millis(900));
    }

    #[test]
    fn test_set_interval() {
        let mut p = Pacer::new(0);
        assert_eq!(p.interval(), Duration::from_micros(1));
        p.set_interval(40_000);
        assert_eq!(p.interval(), Duration::from_millis(40));
    }
}
