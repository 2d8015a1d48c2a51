/*
 *  lib.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Library root - display driver, tabs and the rotation scheduler
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
//! Rotating status tabs on a serial character display.

pub mod config;
pub mod deutils;
pub mod display;
pub mod header;
pub mod httprpc;
pub mod metrics;
pub mod pacer;
pub mod scheduler;
pub mod tabs;

pub use display::{Color, DisplayError, SerialDisplay};
pub use scheduler::{RotationScheduler, TabRegistry};
pub use tabs::{AnyTab, Tab};
