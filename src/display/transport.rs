/*
 *  display/transport.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Serial transport - port setup and an in-memory stand-in for tests
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

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use super::error::DisplayError;

/// Line speed the panel firmware is flashed for
pub const BAUD_RATE: u32 = 500_000;

/// Write timeout for the serial device
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Anything the driver can push bytes into
pub type BoxedTransport = Box<dyn Write + Send>;

/// Open the serial device and apply the raw 8N1 line discipline.
///
/// Opening through `serialport` both acquires the handle and puts the tty in
/// raw mode (no echo, no CR/LF translation, no signals), which is what the
/// escape protocol needs to reach the panel untouched.
pub fn open_port(path: &str) -> Result<BoxedTransport, DisplayError> {
    debug!("Opening {} at {} baud", path, BAUD_RATE);

    let port = serialport::new(path, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|source| DisplayError::PortOpen {
            path: path.to_string(),
            source,
        })?;

    info!("Serial port {} open", path);
    Ok(Box::new(port))
}

/// In-memory transport for running the driver without hardware.
///
/// Every `write` call is recorded as its own entry so tests can see exactly
/// how output was chunked. State is shared, clone the handle from `state()`
/// before moving the transport into a driver.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

#[derive(Debug, Default)]
pub struct MockTransportState {
    /// Payload of each write call, in order
    pub writes: Vec<Vec<u8>>,

    /// Number of flush calls
    pub flush_count: usize,

    /// Fail every write with `BrokenPipe` while set
    pub simulate_write_failure: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockTransportState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything written so far, as text
    pub fn output(&self) -> String {
        self.lock().output()
    }

    /// Forget recorded writes (between phases of a test)
    pub fn clear(&self) {
        let mut state = self.lock();
        state.writes.clear();
        state.flush_count = 0;
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.lock().simulate_write_failure = fail;
    }

    pub fn boxed(&self) -> BoxedTransport {
        Box::new(self.clone())
    }
}

impl MockTransportState {
    pub fn output(&self) -> String {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Writes rendered as text, one entry per write call
    pub fn write_strings(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.simulate_write_failure {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated write failure"));
        }
        state.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush_count += 1;
        Ok(())
    }
}
