/*
 *  display/error.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Error types for the display subsystem
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

use thiserror::Error;

/// Errors surfaced by the serial display driver.
///
/// Bad drawing input never produces an error; only the transport can fail.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The serial device could not be opened or its line settings applied
    #[error("Unable to open serial port {path}: {source}")]
    PortOpen {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// Writing or flushing the transport failed
    #[error("Serial transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl DisplayError {
    /// True when the error came from the port setup rather than a write
    pub fn is_fatal(&self) -> bool {
        matches!(self, DisplayError::PortOpen { .. })
    }
}
