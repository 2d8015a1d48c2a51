/*
 *  header.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Status header - tab title band and position/clock line
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

use chrono::Local;

use crate::display::{Color, DisplayError, SerialDisplay};

/// Draws the two header rows every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusHeader;

impl StatusHeader {
    pub fn new() -> Self {
        Self
    }

    /// Header for tab `index` (0-based) of `count`, stamped with the local time
    pub async fn render(
        &self,
        display: &mut SerialDisplay,
        index: usize,
        title: &str,
        count: usize,
    ) -> Result<(), DisplayError> {
        let clock = Local::now().format("%H:%M").to_string();
        self.render_at(display, index, title, count, &clock).await
    }

    pub async fn render_at(
        &self,
        display: &mut SerialDisplay,
        index: usize,
        title: &str,
        count: usize,
        clock: &str,
    ) -> Result<(), DisplayError> {
        display.home().await?;

        let columns = display.columns();
        display
            .set_background(Color::Red)
            .await?
            .set_foreground(Color::White)
            .await?
            .write_line(&truncate(title, columns))
            .await?;

        let status = compose_status_line(index, count, clock, display.columns());
        display
            .set_background(Color::Black)
            .await?
            .write_line(&status)
            .await?;
        Ok(())
    }
}

fn truncate(text: &str, columns: usize) -> String {
    text.chars().take(columns).collect()
}

/// `"i / n"` on the left, `clock` on the right, exactly `columns` wide.
///
/// At least one space separates the two; the left part gives way first.
pub fn compose_status_line(index: usize, count: usize, clock: &str, columns: usize) -> String {
    let clock_len = clock.chars().count();
    if clock_len >= columns {
        return truncate(clock, columns);
    }

    let position = format!("{} / {}", index + 1, count);
    let position = truncate(&position, columns - clock_len - 1);
    let gap = columns - position.chars().count() - clock_len;

    format!("{position}{}{clock}", " ".repeat(gap))
}
