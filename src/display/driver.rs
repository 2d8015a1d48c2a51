/*
 *  display/driver.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Serial display driver - escape stream, chunked writes and timed flushes
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
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;

use super::buffer::{split_into_chunks, OutputBuffer};
use super::color::Color;
use super::error::DisplayError;
use super::geometry::{clamp_text_size, Orientation, ScreenGeometry};
use super::protocol::{self, Layer};
use super::transport::{open_port, BoxedTransport};

/// Longest run of characters pushed to the panel in one go
pub const CHUNK_LENGTH: usize = 25;

/// Transfer time the panel needs per character
pub const SECONDS_PER_CHAR: f64 = 0.0045;

/// Settle time after a plain escape sequence
pub const COMMAND_DELAY: Duration = Duration::from_millis(1);

/// Settle time after homing the cursor
pub const HOME_DELAY: Duration = Duration::from_millis(100);

/// Settle time for the shutdown sequence
pub const CLEANUP_DELAY: Duration = Duration::from_millis(100);

/// Text size the panel firmware comes up with
pub const POWER_ON_TEXT_SIZE: u8 = 2;

/// Rotation the panel firmware comes up with (landscape)
pub const POWER_ON_ROTATION: u8 = 1;

/// State the driver believes the panel is in.
///
/// The panel cannot be queried, so this is the only record of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub text_size: u8,
    pub orientation: Orientation,
    pub foreground: Color,
    pub background: Color,
    /// Characters written since the start of the current row
    pub column_offset: usize,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            text_size: POWER_ON_TEXT_SIZE,
            orientation: Orientation::from_rotation(POWER_ON_ROTATION),
            foreground: Color::White,
            background: Color::Black,
            column_offset: 0,
        }
    }
}

impl DeviceState {
    pub fn geometry(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.text_size, self.orientation)
    }
}

/// Wait that lets the panel swallow `chars` characters
pub fn transfer_delay(chars: usize) -> Duration {
    Duration::from_secs_f64(SECONDS_PER_CHAR * chars as f64)
}

/// Bytes that return the panel to its power-on look
fn cleanup_sequence() -> String {
    format!(
        "{}{}{}{}\r",
        protocol::reset(),
        protocol::erase_screen(),
        protocol::text_size(POWER_ON_TEXT_SIZE),
        protocol::rotation(POWER_ON_ROTATION)
    )
}

fn closed_error() -> DisplayError {
    DisplayError::Transport(io::Error::new(
        io::ErrorKind::NotConnected,
        "display transport already released",
    ))
}

/// Driver for the serial character panel.
///
/// Every primitive queues its bytes, writes them straight to the transport
/// and then waits long enough for the panel to keep up. Primitives return
/// the driver so calls can be chained:
///
/// ```ignore
/// display.set_foreground(Color::Yellow).await?.write_line("hello").await?;
/// ```
pub struct SerialDisplay {
    /// `None` once cleanup has released the port
    transport: Option<BoxedTransport>,
    buffer: OutputBuffer,
    state: DeviceState,
}

impl SerialDisplay {
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport: Some(transport),
            buffer: OutputBuffer::new(),
            state: DeviceState::default(),
        }
    }

    /// Open the serial device at `path`; failure here is fatal for the caller
    pub fn open(path: &str) -> Result<Self, DisplayError> {
        Ok(Self::new(open_port(path)?))
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.state.geometry()
    }

    pub fn columns(&self) -> usize {
        self.geometry().columns().max(1)
    }

    pub fn rows(&self) -> usize {
        self.geometry().rows()
    }

    pub fn text_size(&self) -> u8 {
        self.state.text_size
    }

    /// Pending output; always empty between primitives
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Push the buffer to the transport, then wait `delay`.
    ///
    /// The panel never acknowledges anything, so pacing is purely by time.
    /// The buffer is empty afterwards even when the write fails.
    pub async fn flush(&mut self, delay: Duration) -> Result<&mut Self, DisplayError> {
        if !self.buffer.is_empty() {
            let bytes = self.buffer.take();
            let transport = self.transport.as_mut().ok_or_else(closed_error)?;
            transport.write_all(&bytes)?;
            transport.flush()?;
        }
        sleep(delay).await;
        Ok(self)
    }

    async fn send(&mut self, sequence: &str, delay: Duration) -> Result<&mut Self, DisplayError> {
        self.buffer.push(sequence);
        self.flush(delay).await
    }

    /// Reset, erase and home, assuming the panel may have power cycled.
    ///
    /// Text size and orientation drop back to the firmware defaults, the
    /// colors held are sent again by the home.
    pub async fn reset(&mut self) -> Result<&mut Self, DisplayError> {
        debug!("Resetting panel");
        self.reset_lcd().await?;
        self.state.text_size = POWER_ON_TEXT_SIZE;
        self.state.orientation = Orientation::from_rotation(POWER_ON_ROTATION);
        self.state.column_offset = 0;
        self.erase_screen().await?;
        self.home().await
    }

    pub async fn reset_lcd(&mut self) -> Result<&mut Self, DisplayError> {
        self.send(&protocol::reset(), COMMAND_DELAY).await
    }

    pub async fn erase_screen(&mut self) -> Result<&mut Self, DisplayError> {
        self.send(&protocol::erase_screen(), COMMAND_DELAY).await
    }

    /// Glyph scale 1..=4, out of range values are clamped
    pub async fn set_text_size(&mut self, size: u8) -> Result<&mut Self, DisplayError> {
        let size = clamp_text_size(size);
        self.state.text_size = size;
        self.state.column_offset %= self.columns();
        self.send(&protocol::text_size(size), COMMAND_DELAY).await
    }

    /// Rotation 0..=3; even values are portrait
    pub async fn set_rotation(&mut self, rotation: u8) -> Result<&mut Self, DisplayError> {
        let rotation = rotation.min(3);
        self.state.orientation = Orientation::from_rotation(rotation);
        self.state.column_offset %= self.columns();
        self.send(&protocol::rotation(rotation), COMMAND_DELAY).await
    }

    pub async fn set_foreground(&mut self, color: Color) -> Result<&mut Self, DisplayError> {
        self.state.foreground = color;
        self.send(&protocol::color(Layer::Foreground, color), COMMAND_DELAY).await
    }

    pub async fn set_background(&mut self, color: Color) -> Result<&mut Self, DisplayError> {
        self.state.background = color;
        self.send(&protocol::color(Layer::Background, color), COMMAND_DELAY).await
    }

    /// Cursor to 0x0.
    ///
    /// The panel drops its colors on home, so the held colors are sent
    /// again straight after.
    pub async fn home(&mut self) -> Result<&mut Self, DisplayError> {
        self.send(&protocol::home(), HOME_DELAY).await?;
        self.state.column_offset = 0;

        let (background, foreground) = (self.state.background, self.state.foreground);
        self.set_background(background).await?;
        self.set_foreground(foreground).await
    }

    pub async fn set_cursor_pos(&mut self, x: u16, y: u16) -> Result<&mut Self, DisplayError> {
        self.send(&protocol::cursor_pos(x, y), COMMAND_DELAY).await
    }

    pub async fn linebreak(&mut self) -> Result<&mut Self, DisplayError> {
        self.state.column_offset = 0;
        self.send(protocol::LINE_BREAK, COMMAND_DELAY).await
    }

    /// Print `text` at the cursor, `CHUNK_LENGTH` characters per flush
    pub async fn write(&mut self, text: &str) -> Result<&mut Self, DisplayError> {
        let written = text.chars().count();
        self.state.column_offset = (self.state.column_offset + written) % self.columns();

        for chunk in split_into_chunks(text, CHUNK_LENGTH) {
            self.buffer.push(chunk);
            self.flush(transfer_delay(chunk.chars().count())).await?;
        }
        Ok(self)
    }

    /// Print `text` and blank the rest of the row.
    ///
    /// Overwrites whatever a longer line left behind on the same row.
    pub async fn write_line(&mut self, text: &str) -> Result<&mut Self, DisplayError> {
        let padding = line_padding(text.chars().count(), self.state.column_offset, self.columns());
        let line = format!("{text}{}", " ".repeat(padding));
        self.write(&line).await
    }

    /// Blank `count` rows below the first `start` rows
    pub async fn erase_rows(&mut self, start: usize, count: usize) -> Result<&mut Self, DisplayError> {
        self.home().await?;
        for _ in 0..start {
            self.linebreak().await?;
        }
        for _ in 0..count {
            let blank = " ".repeat(self.columns());
            self.write(&blank).await?;
        }
        Ok(self)
    }

    /// Put the panel back to its power-on look and release the port.
    ///
    /// Only the first call does anything.
    pub async fn cleanup(&mut self) -> Result<(), DisplayError> {
        if self.transport.is_none() {
            return Ok(());
        }
        self.buffer.clear();
        let result = self.send(&cleanup_sequence(), CLEANUP_DELAY).await.map(|_| ());
        self.transport = None;
        info!("Display released");
        result
    }
}

impl Drop for SerialDisplay {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            warn!("Display dropped without cleanup, resetting panel");
            let result = transport
                .write_all(cleanup_sequence().as_bytes())
                .and_then(|_| transport.flush());
            if let Err(e) = result {
                warn!("Panel reset on drop failed: {}", e);
            }
        }
    }
}

/// Spaces needed so the row ends exactly at the right edge
pub fn line_padding(text_len: usize, column_offset: usize, columns: usize) -> usize {
    let columns = columns.max(1);
    (columns - (text_len + column_offset) % columns) % columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::transport::MockTransport;
    use tokio::time::Instant;

    fn mock_display() -> (SerialDisplay, MockTransport) {
        let transport = MockTransport::new();
        (SerialDisplay::new(transport.boxed()), transport)
    }

    fn writes(transport: &MockTransport) -> Vec<String> {
        transport.state().lock().unwrap().write_strings()
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_write_is_chunked() {
        let (mut display, transport) = mock_display();
        let text: String = (0..60).map(|i| (b'A' + (i % 26) as u8) as char).collect();

        display.write(&text).await.unwrap();

        let w = writes(&transport);
        assert_eq!(w.len(), 3);
        assert_eq!(w[0].len(), 25);
        assert_eq!(w[1].len(), 25);
        assert_eq!(w[2].len(), 10);
        assert_eq!(w.concat(), text);
        assert!(display.buffer().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_write_single_flush_with_delay() {
        let (mut display, transport) = mock_display();
        let started = Instant::now();

        display.write("twenty characters!!!").await.unwrap();

        assert_eq!(writes(&transport), vec!["twenty characters!!!".to_string()]);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(89) && waited <= Duration::from_millis(91));
    }

    #[tokio::test(start_paused = true)]
    async fn test_column_offset_wraps() {
        let (mut display, _transport) = mock_display();
        let columns = display.columns();
        assert_eq!(columns, 26);

        for before in 0..columns {
            for len in [0usize, 1, 5, 25, 26, 40] {
                display.linebreak().await.unwrap();
                if before > 0 {
                    display.write(&"x".repeat(before)).await.unwrap();
                }
                assert_eq!(display.state().column_offset, before);
                display.write(&"y".repeat(len)).await.unwrap();
                assert_eq!(display.state().column_offset, (before + len) % columns);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_line_pads_to_row_end() {
        let (mut display, transport) = mock_display();
        display.write("abc").await.unwrap();
        transport.clear();

        display.write_line("hello").await.unwrap();

        let out = transport.output();
        assert_eq!(out.len(), 26 - 3);
        assert!(out.starts_with("hello"));
        assert!(out[5..].chars().all(|c| c == ' '));
        assert_eq!(display.state().column_offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_line_exactly_full_adds_nothing() {
        let (mut display, transport) = mock_display();
        display.write("0123456789").await.unwrap();
        transport.clear();

        let rest = "a".repeat(16);
        display.write_line(&rest).await.unwrap();

        assert_eq!(transport.output(), rest);
        assert_eq!(display.state().column_offset, 0);
    }

    #[test]
    fn test_line_padding_law() {
        let columns = 26;
        for offset in 0..columns {
            for len in 0..80 {
                let pad = line_padding(len, offset, columns);
                assert!(pad < columns);
                assert_eq!((offset + len + pad) % columns, 0);
            }
        }
        assert_eq!(line_padding(26, 0, 26), 0);
        assert_eq!(line_padding(5, 0, 26), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_reasserts_held_colors() {
        let (mut display, transport) = mock_display();
        display.set_foreground(Color::Red).await.unwrap();
        display.set_background(Color::Blue).await.unwrap();
        transport.clear();

        display.home().await.unwrap();
        assert_eq!(writes(&transport), vec!["\x1b[H", "\x1b[44m", "\x1b[31m"]);

        transport.clear();
        for _ in 0..3 {
            display.home().await.unwrap();
        }
        let w = writes(&transport);
        assert_eq!(w.len(), 9);
        for call in w.chunks(3) {
            assert_eq!(call, ["\x1b[H", "\x1b[44m", "\x1b[31m"]);
        }
        assert_eq!(display.state().foreground, Color::Red);
        assert_eq!(display.state().background, Color::Blue);
        assert_eq!(display.state().column_offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_home_waits_for_panel() {
        let (mut display, _transport) = mock_display();
        let started = Instant::now();
        display.home().await.unwrap();
        assert!(started.elapsed() >= HOME_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_order() {
        let (mut display, transport) = mock_display();
        display.reset().await.unwrap();
        let w = writes(&transport);
        assert_eq!(&w[..3], ["\x1bc", "\x1b[2J", "\x1b[H"]);
        assert_eq!(&w[3..], ["\x1b[40m", "\x1b[37m"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_power_on_geometry() {
        let (mut display, _transport) = mock_display();
        display.set_text_size(4).await.unwrap();
        display.set_rotation(0).await.unwrap();
        display.set_foreground(Color::Cyan).await.unwrap();
        display.write("abc").await.unwrap();

        display.reset().await.unwrap();

        assert_eq!(display.text_size(), 2);
        assert_eq!(display.state().orientation, Orientation::Horizontal);
        assert_eq!(display.columns(), 26);
        assert_eq!(display.state().column_offset, 0);
        assert_eq!(display.state().foreground, Color::Cyan);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_sets_orientation() {
        let (mut display, transport) = mock_display();
        display.set_rotation(0).await.unwrap();
        assert_eq!(display.state().orientation, Orientation::Vertical);
        assert_eq!(display.columns(), 20);

        display.set_rotation(3).await.unwrap();
        assert_eq!(display.state().orientation, Orientation::Horizontal);

        display.set_rotation(7).await.unwrap();
        assert_eq!(writes(&transport).last().unwrap(), "\x1b[3r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_size_clamped_and_emitted() {
        let (mut display, transport) = mock_display();
        display.set_text_size(9).await.unwrap();
        assert_eq!(display.text_size(), 4);
        assert_eq!(display.columns(), 13);
        assert_eq!(writes(&transport), vec!["\x1b[4s"]);

        display.set_text_size(0).await.unwrap();
        assert_eq!(display.text_size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_erase_rows_skips_header_row() {
        let (mut display, transport) = mock_display();
        display.set_text_size(4).await.unwrap();
        transport.clear();

        let rows = display.rows();
        display.erase_rows(1, rows - 1).await.unwrap();

        let w = writes(&transport);
        let first_break = w.iter().position(|s| s == "\n\r").unwrap();
        let first_blank = w
            .iter()
            .position(|s| !s.is_empty() && s.chars().all(|c| c == ' '))
            .unwrap();
        assert_eq!(w[0], "\x1b[H");
        assert!(first_break < first_blank);
        assert_eq!(w.iter().filter(|s| *s == "\n\r").count(), 1);

        let blanks: usize = w
            .iter()
            .filter(|s| !s.is_empty() && s.chars().all(|c| c == ' '))
            .map(|s| s.len())
            .sum();
        assert_eq!(blanks, (rows - 1) * display.columns());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_surfaces() {
        let (mut display, transport) = mock_display();
        transport.set_write_failure(true);

        let err = display.write("boom").await.err().unwrap();
        assert!(matches!(err, DisplayError::Transport(_)));
        assert!(!err.is_fatal());
        assert!(display.buffer().is_empty());

        transport.set_write_failure(false);
        assert!(display.write("ok").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_runs_once() {
        let (mut display, transport) = mock_display();
        display.cleanup().await.unwrap();
        display.cleanup().await.unwrap();
        assert!(!display.is_open());

        drop(display);
        let out = transport.output();
        assert_eq!(out.matches("\x1bc").count(), 1);
        assert!(out.starts_with("\x1bc\x1b[2J"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_without_cleanup_resets_panel() {
        let (mut display, transport) = mock_display();
        display.write("x").await.unwrap();
        drop(display);
        assert!(transport.output().ends_with("\x1bc\x1b[2J\x1b[2s\x1b[1r\r"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_after_cleanup_fails() {
        let (mut display, _transport) = mock_display();
        display.cleanup().await.unwrap();
        assert!(display.write("late").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chained_calls() {
        let (mut display, transport) = mock_display();
        display
            .set_foreground(Color::Yellow)
            .await
            .unwrap()
            .write_line("chain")
            .await
            .unwrap();
        assert!(transport.output().starts_with("\x1b[33mchain"));
    }
}
