/*
 *  display/protocol.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Escape sequences spoken by the serial panel firmware
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

use super::color::Color;

pub const ESC: char = '\x1b';

/// Carriage handling the firmware expects for a new line
pub const LINE_BREAK: &str = "\n\r";

/// Which SGR group a color escape targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Foreground = 3,
    Background = 4,
}

pub fn reset() -> String {
    format!("{ESC}c")
}

pub fn erase_screen() -> String {
    format!("{ESC}[2J")
}

pub fn home() -> String {
    format!("{ESC}[H")
}

pub fn text_size(size: u8) -> String {
    format!("{ESC}[{size}s")
}

pub fn rotation(rotation: u8) -> String {
    format!("{ESC}[{rotation}r")
}

pub fn cursor_pos(x: u16, y: u16) -> String {
    format!("{ESC}[{x};{y}H")
}

pub fn color(layer: Layer, color: Color) -> String {
    format!("{ESC}[{}{}m", layer as u8, color.code())
}
