//! Growable byte buffer with mark/reset/commit semantics.
//!
//! Decoding a frame reads through a cursor that only moves forward inside the
//! buffer. Nothing is thrown away until [`FrameBuffer::commit`] is called, so a
//! decoder that runs out of bytes halfway through a frame can call
//! [`FrameBuffer::reset`] and try again once more data has arrived:
//!
//! ```text
//!   committed      cursor
//!   |              |
//!   v              v
//!   +--------------+-------------------+-------------+
//!   | read, kept   | not yet examined  | spare space |
//!   +--------------+-------------------+-------------+
//!   ^
//!   mark
//! ```

use bytes::{Buf, BytesMut};

const INITIAL_CAPACITY: usize = 4096;
const READ_RESERVE: usize = 4096;

#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: BytesMut,
    cursor: usize,
    mark: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            cursor: 0,
            mark: 0,
        }
    }

    /// Appends bytes at the end of the buffer, growing it if needed.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Exposes the backing storage for a socket read, with spare room reserved.
    pub fn spare_mut(&mut self) -> &mut BytesMut {
        if self.data.capacity() - self.data.len() < READ_RESERVE {
            self.data.reserve(READ_RESERVE);
        }

        &mut self.data
    }

    /// Remembers the current read position.
    pub fn mark(&mut self) {
        self.mark = self.cursor;
    }

    /// Rewinds the read position to the last mark. No bytes are consumed.
    pub fn reset(&mut self) {
        self.cursor = self.mark;
    }

    /// Discards every byte up to the current read position.
    pub fn commit(&mut self) {
        self.data.advance(self.cursor);
        self.cursor = 0;
        self.mark = 0;
    }

    /// Drops `count` bytes from the front, used after a partial socket write.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.data.len());
        self.data.advance(count);
        self.cursor = self.cursor.saturating_sub(count);
        self.mark = self.mark.saturating_sub(count);
    }

    /// Every byte that has not been committed or consumed yet.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes between the read position and the end of the data.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.cursor)?;
        self.cursor += 1;
        Some(byte)
    }

    /// Reads up to the next CRLF. The returned line excludes the terminator,
    /// which is consumed as well.
    pub fn read_line(&mut self) -> Option<&[u8]> {
        let unread = &self.data[self.cursor..];
        let position = unread.windows(2).position(|window| window == b"\r\n")?;

        let start = self.cursor;
        self.cursor += position + 2;
        Some(&self.data[start..start + position])
    }

    pub fn read_exact(&mut self, count: usize) -> Option<&[u8]> {
        if self.remaining() < count {
            return None;
        }

        let start = self.cursor;
        self.cursor += count;
        Some(&self.data[start..start + count])
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBuffer;

    #[test]
    fn test_reset_rewinds_to_mark() {
        let mut buffer = FrameBuffer::new();
        buffer.append(b"+OK\r\n+PO");

        buffer.mark();
        assert_eq!(buffer.read_byte(), Some(b'+'));
        assert_eq!(buffer.read_line(), Some(&b"OK"[..]));
        buffer.commit();

        buffer.mark();
        assert_eq!(buffer.read_byte(), Some(b'+'));
        assert_eq!(buffer.read_line(), None);
        buffer.reset();

        assert_eq!(buffer.remaining(), 3);
        assert_eq!(buffer.as_bytes(), b"+PO");
    }

    #[test]
    fn test_partial_line_completes_after_append() {
        let mut buffer = FrameBuffer::new();
        buffer.append(b"hello\r");

        buffer.mark();
        assert_eq!(buffer.read_line(), None);
        buffer.reset();

        buffer.append(b"\nworld");
        assert_eq!(buffer.read_line(), Some(&b"hello"[..]));
        assert_eq!(buffer.read_exact(6), None);
        assert_eq!(buffer.read_exact(5), Some(&b"world"[..]));
        buffer.commit();

        assert!(buffer.is_empty());
    }

    #[test]
    fn test_consume_keeps_cursor_in_bounds() {
        let mut buffer = FrameBuffer::new();
        buffer.append(b"abcdef");
        buffer.read_exact(2);
        buffer.mark();

        buffer.consume(4);

        assert_eq!(buffer.as_bytes(), b"ef");
        assert_eq!(buffer.remaining(), 2);

        buffer.consume(10);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut buffer = FrameBuffer::with_capacity(4);
        let payload = vec![b'x'; 10_000];

        buffer.append(&payload);

        assert_eq!(buffer.len(), 10_000);
        assert_eq!(buffer.read_exact(10_000).map(|bytes| bytes.len()), Some(10_000));
    }
}
