/*
 *  display/color.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Eight-color palette understood by the panel firmware
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

/// Panel color. The discriminant is the digit sent in the SGR escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl Color {
    /// Digit used in `ESC [ 3<c> m` / `ESC [ 4<c> m`
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Traffic-light color for a usage fraction (0.0..=1.0).
    ///
    /// Green below a third, yellow up to two thirds, red past that.
    pub fn for_usage(fraction: f64) -> Self {
        if fraction < USAGE_YELLOW_THRESHOLD {
            Color::Green
        } else if fraction <= USAGE_RED_THRESHOLD {
            Color::Yellow
        } else {
            Color::Red
        }
    }
}

pub const USAGE_YELLOW_THRESHOLD: f64 = 0.33;
pub const USAGE_RED_THRESHOLD: f64 = 0.66;
