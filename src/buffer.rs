//! Rewindable, frame-annotated byte buffer.
//!
//! Bytes are never discarded on read: a cursor advances over a flat vector,
//! so a failed decode can still dump the bytes around the point of failure.
//! Every batch appended via [`FramedBuffer::extend`] is tagged with a frame
//! id (the capture record that produced it); the buffer tracks which frame
//! owns the byte currently under the cursor.

use std::collections::HashMap;

/// A byte paired with the capture frame that contributed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramedByte {
    pub byte: u8,
    pub frame: u32,
}

/// Append-only byte sequence with frame provenance and a non-destructive
/// read cursor.
#[derive(Debug, Default)]
pub struct FramedBuffer {
    buf: Vec<u8>,
    insert_boundaries: std::collections::HashSet<usize>,
    cursor: usize,
    /// frame id -> half-open byte range [start, end)
    frames: HashMap<u32, (usize, usize)>,
    /// range start -> frame id, used to resolve `current_frame` lazily.
    begin_to_frame: HashMap<usize, u32>,
    current_frame: Option<u32>,
}

impl FramedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        debug_assert!(self.cursor <= self.buf.len());
        self.buf.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Append a batch of bytes, all attributed to `frame`.
    pub fn extend(&mut self, bytes: impl IntoIterator<Item = u8>, frame: u32) {
        let start = self.buf.len();
        self.buf.extend(bytes);
        self.insert_boundaries.insert(self.buf.len());
        self.frames.insert(frame, (start, self.buf.len()));
        self.begin_to_frame.insert(start, frame);
    }

    /// Pop the next byte, advancing the cursor. Does not remove the byte
    /// from the underlying buffer, so `get_context` can still see it.
    pub fn popleft(&mut self) -> Option<u8> {
        if self.cursor >= self.buf.len() {
            return None;
        }
        let ret = self.buf[self.cursor];
        self.advance_frame_for(self.cursor);
        self.cursor += 1;
        Some(ret)
    }

    fn advance_frame_for(&mut self, idx: usize) {
        match self.current_frame {
            None => {
                let frame = self.begin_to_frame[&idx];
                let (begin, _) = self.frames[&frame];
                debug_assert_eq!(idx, begin);
                self.current_frame = Some(frame);
            }
            Some(frame) => {
                let (begin, end) = self.frames[&frame];
                debug_assert!(idx >= begin);
                if idx >= end {
                    let frame = self.begin_to_frame[&idx];
                    let (begin, _) = self.frames[&frame];
                    debug_assert_eq!(idx, begin);
                    self.current_frame = Some(frame);
                }
            }
        }
    }

    /// True iff the cursor currently sits exactly on an insertion boundary
    /// (the start of some `extend` call).
    pub fn at_boundary(&self) -> bool {
        self.insert_boundaries.contains(&self.cursor)
    }

    /// The frame owning the byte under the cursor, or the last frame seen
    /// if the cursor has run off the end.
    pub fn current_frame(&self) -> Option<u32> {
        self.current_frame
    }

    /// Look up the frame that owns an arbitrary absolute index, scanning
    /// the frame table. Used for diagnostic dumps, not the decode hot path.
    pub fn frame_of(&self, idx: usize) -> Option<u32> {
        self.frames
            .iter()
            .find(|(_, (begin, end))| idx >= *begin && idx < *end)
            .map(|(frame, _)| *frame)
    }

    /// Up to `context` bytes before and after the cursor, with offsets
    /// relative to the cursor (negative = already consumed).
    pub fn get_context(&self, context: usize) -> Vec<(i64, u8)> {
        let first_idx = self.cursor.saturating_sub(context);
        let last_idx = (self.cursor + context).min(self.buf.len());
        self.buf[first_idx..last_idx]
            .iter()
            .enumerate()
            .map(|(i, &b)| ((first_idx + i) as i64 - self.cursor as i64, b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_and_tracks_frame() {
        let mut buf = FramedBuffer::new();
        buf.extend([1, 2, 3], 1);
        buf.extend([4, 5], 2);

        assert!(buf.at_boundary());
        assert_eq!(buf.popleft(), Some(1));
        assert_eq!(buf.current_frame(), Some(1));
        assert!(!buf.at_boundary());
        assert_eq!(buf.popleft(), Some(2));
        assert_eq!(buf.popleft(), Some(3));
        assert!(buf.at_boundary());
        assert_eq!(buf.popleft(), Some(4));
        assert_eq!(buf.current_frame(), Some(2));
        assert_eq!(buf.remaining(), 1);
    }

    #[test]
    fn context_window_spans_cursor() {
        let mut buf = FramedBuffer::new();
        buf.extend([10, 11, 12, 13, 14], 1);
        buf.popleft();
        buf.popleft();
        let ctx = buf.get_context(1);
        assert_eq!(ctx, vec![(-1, 11), (0, 12), (1, 13)]);
    }

    #[test]
    fn frame_of_resolves_arbitrary_index() {
        let mut buf = FramedBuffer::new();
        buf.extend([1, 2], 7);
        buf.extend([3, 4], 9);
        assert_eq!(buf.frame_of(0), Some(7));
        assert_eq!(buf.frame_of(1), Some(7));
        assert_eq!(buf.frame_of(2), Some(9));
        assert_eq!(buf.frame_of(3), Some(9));
    }

    #[test]
    fn empty_buffer_has_no_bytes() {
        let buf = FramedBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.current_frame(), None);
    }
}
