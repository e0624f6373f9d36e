//! Unread-output buffer with tail-search and ANSI stripping.
//!
//! Only the last `search_depth` bytes are searched for end-anchored prompt
//! patterns, rather than the entire output. Login-stage patterns, which may sit
//! anywhere in a long banner, use a full search instead.
//!
//! Bytes that are not UTF-8 (GBK descriptions on H3C and Huawei gear, for
//! instance) bypass the escape parser and are kept as received.

use std::fmt;

use bytes::{Buf, BytesMut};
use regex::bytes::Regex;

/// Buffer for accumulating device output and searching it for patterns.
///
/// Incoming bytes pass through a `vte` parser that drops escape sequences
/// (colours, cursor movement, window titles) but keeps printable text and C0
/// control bytes such as `\r`, `\n` and NUL. The parser is persistent, so an
/// escape sequence split across two reads is still removed.
pub struct PatternBuffer {
    /// The accumulated, not yet consumed output.
    buffer: BytesMut,

    /// How many bytes from the end to search for prompt patterns.
    search_depth: usize,

    /// Escape-sequence state carried between chunks.
    parser: vte::Parser,

    /// Trailing bytes of an incomplete UTF-8 sequence, held for the next chunk.
    partial: Vec<u8>,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: vte::Parser::new(),
            partial: Vec::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut held = std::mem::take(&mut self.partial);
        held.extend_from_slice(data);

        let mut rest = held.as_slice();
        while !rest.is_empty() {
            let (valid, invalid) = match std::str::from_utf8(rest) {
                Ok(_) => (rest.len(), None),
                Err(e) => (e.valid_up_to(), Some(e.error_len())),
            };
            self.advance(&rest[..valid]);
            rest = &rest[valid..];
            match invalid {
                None => break,
                Some(Some(len)) => {
                    self.buffer.extend_from_slice(&rest[..len]);
                    rest = &rest[len..];
                }
                Some(None) => {
                    self.partial = rest.to_vec();
                    break;
                }
            }
        }
    }

    /// Append bytes held back as an incomplete UTF-8 sequence.
    ///
    /// Called when no more output is coming, so nothing is lost at the end
    /// of the stream.
    pub fn flush(&mut self) {
        let held = std::mem::take(&mut self.partial);
        self.buffer.extend_from_slice(&held);
    }

    fn advance(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        let mut sink = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut sink, text);
    }

    /// Search the tail of the buffer.
    ///
    /// Returns the absolute byte range of the first match.
    pub fn find_tail(&self, pattern: &Regex) -> Option<(usize, usize)> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern
            .find(&self.buffer[start..])
            .map(|m| (start + m.start(), start + m.end()))
    }

    /// Search the entire buffer.
    pub fn find(&self, pattern: &Regex) -> Option<(usize, usize)> {
        pattern.find(&self.buffer).map(|m| (m.start(), m.end()))
    }

    /// Remove and return everything up to `end`, leaving the rest unread.
    pub fn consume(&mut self, end: usize) -> Vec<u8> {
        let end = end.min(self.buffer.len());
        let taken = self.buffer[..end].to_vec();
        self.buffer.advance(end);
        taken
    }

    /// The last line of the buffer, for trace logging.
    pub fn last_line(&self) -> &[u8] {
        let trimmed = self
            .buffer
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(0, |i| i + 1);
        let head = &self.buffer[..trimmed];
        match memchr::memrchr2(b'\r', b'\n', head) {
            Some(pos) => &head[pos + 1..],
            None => head,
        }
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// `vte` performer that keeps text and control bytes, dropping sequences.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        self.out.extend_from_slice(&[byte]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_slice(), b"Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Green text");
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"abc\x1b[3");
        buffer.extend(b"2mdef");
        assert_eq!(buffer.as_slice(), b"abcdef");
    }

    #[test]
    fn test_control_bytes_kept() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\r\n\x00<SW>");
        assert_eq!(buffer.as_slice(), b"\r\n\x00<SW>");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert_eq!(buffer.find_tail(&pattern), Some((101, 108)));
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.find_tail(&pattern).is_none());
        assert!(buffer.find(&pattern).is_some());
    }

    #[test]
    fn test_consume_leaves_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"password: extra");
        assert_eq!(buffer.consume(10), b"password: ");
        assert_eq!(buffer.as_slice(), b"extra");
    }

    #[test]
    fn test_non_utf8_bytes_kept() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\r\n\xc4\xe3\xba\xc3 \x1b[1mdesc\x1b[0m\r\n<SW-1>");
        assert_eq!(buffer.as_slice(), b"\r\n\xc4\xe3\xba\xc3 desc\r\n<SW-1>");
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend("<SW-".as_bytes());
        buffer.extend(b"\xe4\xb8");
        assert_eq!(buffer.as_slice(), b"<SW-");
        buffer.extend(b"\xad>");
        assert_eq!(buffer.as_slice(), "<SW-\u{4e2d}>".as_bytes());
    }

    #[test]
    fn test_flush_incomplete_sequence() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"abc\xe4\xb8");
        buffer.flush();
        assert_eq!(buffer.as_slice(), b"abc\xe4\xb8");
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_last_line() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"output\r\n<SW-1>\r\n");
        assert_eq!(buffer.last_line(), b"<SW-1>");
    }
}
