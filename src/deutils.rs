/*
 *  deutils.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Formatting helpers and lenient deserializers
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

use serde::{Deserialize, Deserializer};
use serde_json::Value;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const YEAR: u64 = 52 * WEEK;

/// Largest unit first, each as `"<n><unit> "`.
///
/// `90061` gives `"1D 1h 1m 1s "`; zero is `"0s"`.
pub fn format_timespan(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }
    let units = [(YEAR, 'Y'), (WEEK, 'W'), (DAY, 'D'), (HOUR, 'h'), (MINUTE, 'm'), (1, 's')];

    let mut remaining = seconds;
    let mut out = String::new();
    for (divider, unit) in units {
        if remaining >= divider {
            out.push_str(&format!("{}{} ", remaining / divider, unit));
            remaining %= divider;
        }
    }
    out
}

/// `length` characters, `|` where `i / length <= fraction`.
///
/// Position 0 is always filled, so an idle bar still shows one tick.
pub fn progress_bar(length: usize, fraction: f64) -> String {
    (0..length)
        .map(|i| if i as f64 / length as f64 <= fraction { '|' } else { ' ' })
        .collect()
}

/// Decimal byte size, two decimals with trailing zeros dropped
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

    if bytes < 1000 {
        return if bytes == 1 { "1 byte".to_string() } else { format!("{bytes} bytes") };
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }

    let number = format!("{value:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{number} {unit}")
}

/// Accepts `12.5` as well as `"12.5"`; tickers tend to quote their numbers
pub fn deserialize_numeric_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| D::Error::custom(format!("non-numeric value: {v}")))
}
