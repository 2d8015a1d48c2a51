/*
 *  display/mod.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Display subsystem - serial character panel driven by escape sequences
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

pub mod buffer;
pub mod color;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod protocol;
pub mod transport;

pub use color::Color;
pub use driver::{DeviceState, SerialDisplay};
pub use error::DisplayError;
pub use geometry::{Orientation, ScreenGeometry};
pub use transport::{open_port, BoxedTransport, MockTransport};
