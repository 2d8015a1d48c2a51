/*
 *  display/geometry.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Panel geometry - character grid for a given text size and orientation
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

/// Physical panel width in device units
pub const WIDTH: u32 = 320;
/// Physical panel height in device units
pub const HEIGHT: u32 = 240;

/// Glyph cell at text size 1
const GLYPH_WIDTH: u32 = 6;
const GLYPH_HEIGHT: u32 = 8;

pub const MIN_TEXT_SIZE: u8 = 1;
pub const MAX_TEXT_SIZE: u8 = 4;

/// Panel orientation as tracked by the driver.
///
/// The firmware treats even rotations (0, 2) as portrait and odd ones as
/// landscape, so the mapping from a rotation value lives here too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn from_rotation(rotation: u8) -> Self {
        if rotation % 2 == 0 {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

/// Character grid of the panel. Pure, recomputed whenever asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub text_size: u8,
    pub orientation: Orientation,
}

impl ScreenGeometry {
    pub fn new(text_size: u8, orientation: Orientation) -> Self {
        Self {
            text_size: clamp_text_size(text_size),
            orientation,
        }
    }

    /// Characters per row
    pub fn columns(&self) -> usize {
        let dim = match self.orientation {
            Orientation::Horizontal => WIDTH,
            Orientation::Vertical => HEIGHT,
        };
        (dim / (self.text_size as u32 * GLYPH_WIDTH)) as usize
    }

    /// Rows of text on screen
    pub fn rows(&self) -> usize {
        let dim = match self.orientation {
            Orientation::Horizontal => HEIGHT,
            Orientation::Vertical => WIDTH,
        };
        (dim / (self.text_size as u32 * GLYPH_HEIGHT)) as usize
    }
}

pub fn clamp_text_size(size: u8) -> u8 {
    size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_two_landscape() {
        let geo = ScreenGeometry::new(2, Orientation::Horizontal);
        assert_eq!(geo.columns(), 26);
        assert_eq!(geo.rows(), 15);
    }

    #[test]
    fn test_all_sizes_both_orientations() {
        for size in 1..=4u32 {
            let h = ScreenGeometry::new(size as u8, Orientation::Horizontal);
            assert_eq!(h.columns() as u32, 320 / (size * 6));
            assert_eq!(h.rows() as u32, 240 / (size * 8));

            let v = ScreenGeometry::new(size as u8, Orientation::Vertical);
            assert_eq!(v.columns() as u32, 240 / (size * 6));
            assert_eq!(v.rows() as u32, 320 / (size * 8));
        }
    }

    #[test]
    fn test_text_size_clamped() {
        assert_eq!(ScreenGeometry::new(0, Orientation::Horizontal).text_size, 1);
        assert_eq!(ScreenGeometry::new(9, Orientation::Horizontal).text_size, 4);
    }

    #[test]
    fn test_orientation_from_rotation() {
        assert_eq!(Orientation::from_rotation(0), Orientation::Vertical);
        assert_eq!(Orientation::from_rotation(1), Orientation::Horizontal);
        assert_eq!(Orientation::from_rotation(2), Orientation::Vertical);
        assert_eq!(Orientation::from_rotation(3), Orientation::Horizontal);
    }
}
