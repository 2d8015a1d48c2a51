/*
 *  display/buffer.rs
 *
 *  showtime - tabs on a serial screen
 *	(c) 2020-26 Stuart Hunter
 *
 *	Pending output awaiting the next timed flush
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

/// Characters and escapes queued by a primitive.
///
/// Every driver primitive appends here and then flushes, so the buffer is
/// empty between primitives. Kept as its own type so the flush contract can
/// be checked without a transport.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer {
    pending: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.pending
    }

    /// Hand back the pending bytes, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending).into_bytes()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Split `text` into pieces of at most `length` characters.
///
/// Splits on character boundaries, never inside a UTF-8 sequence. Text that
/// already fits comes back as a single piece, empty text as one empty piece.
pub fn split_into_chunks(text: &str, length: usize) -> Vec<&str> {
    let length = length.max(1);
    if text.chars().count() <= length {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == length {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empties_buffer() {
        let mut buf = OutputBuffer::new();
        buf.push("\x1b[H");
        buf.push("hi");
        assert_eq!(buf.as_str(), "\x1b[Hhi");
        assert_eq!(buf.take(), b"\x1b[Hhi".to_vec());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_into_chunks("hello", 25), vec!["hello"]);
        assert_eq!(split_into_chunks("", 25), vec![""]);
        let exact = "a".repeat(25);
        assert_eq!(split_into_chunks(&exact, 25).len(), 1);
    }

    #[test]
    fn test_long_text_chunk_count_and_concat() {
        for len in [26usize, 49, 50, 51, 100, 123] {
            let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
            let chunks = split_into_chunks(&text, 25);
            assert_eq!(chunks.len(), len.div_ceil(25), "len {len}");
            assert!(chunks.iter().all(|c| c.chars().count() <= 25));
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "é".repeat(30);
        let chunks = split_into_chunks(&text, 25);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 25);
        assert_eq!(chunks[1].chars().count(), 5);
    }
}
