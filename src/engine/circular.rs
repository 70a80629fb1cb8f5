//! Recording ring buffer for the engine's input history.

use assume::assume;

// -------------------------------------------------------------------------------------------------

/// Multi channel ring buffer with a single write cursor, shared by all channels.
///
/// Reads are addressed relative to the write cursor and may use any (also negative) offset:
/// all offsets get wrapped into the buffer's capacity.
#[derive(Debug)]
pub(crate) struct CircularBuffer<const CHANNELS: usize> {
    frames: Vec<[f32; CHANNELS]>,
    write_pos: usize,
}

impl<const CHANNELS: usize> CircularBuffer<CHANNELS> {
    /// Create a new, silent buffer with the given capacity in frames (at least 1).
    pub fn new(capacity: usize) -> Self {
        let frames = vec![[0.0; CHANNELS]; capacity.max(1)];
        let write_pos = 0;
        Self { frames, write_pos }
    }

    /// Resize the buffer, clear its content and reset the write cursor.
    pub fn resize(&mut self, capacity: usize) {
        self.frames.clear();
        self.frames.resize(capacity.max(1), [0.0; CHANNELS]);
        self.write_pos = 0;
    }

    /// Clear the buffer's content and reset the write cursor.
    pub fn flush(&mut self) {
        self.frames.fill([0.0; CHANNELS]);
        self.write_pos = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[allow(unused)]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Store a sample at the write cursor. Call [`Self::advance`] after all channels of a frame
    /// got written.
    #[inline]
    pub fn write(&mut self, channel: usize, sample: f32) {
        self.frames[self.write_pos][channel] = sample;
    }

    /// Move the write cursor to the next frame.
    #[inline]
    pub fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos == self.frames.len() {
            self.write_pos = 0;
        }
    }

    /// Buffer index of the frame at `offset` frames relative to the write cursor.
    #[inline]
    pub fn wrapped_index(&self, offset: isize) -> usize {
        let capacity = self.frames.len();
        let offset = offset.rem_euclid(capacity as isize) as usize;
        let index = self.write_pos + offset;
        if index >= capacity {
            index - capacity
        } else {
            index
        }
    }

    /// Read a sample at `offset` frames relative to the write cursor.
    #[inline]
    pub fn read_at(&self, channel: usize, offset: isize) -> f32 {
        let index = self.wrapped_index(offset);
        assume!(unsafe: index < self.frames.len(), "Wrapped indices are always in range");
        self.frames[index][channel]
    }

    /// Copy `target.len()` consecutive frames, starting at `offset` frames relative to the write
    /// cursor, into the given target. Wraps around as often as necessary.
    pub fn copy_frames(&self, offset: isize, target: &mut [[f32; CHANNELS]]) {
        let capacity = self.frames.len();
        let mut index = self.wrapped_index(offset);
        for frame in target.iter_mut() {
            assume!(unsafe: index < capacity, "Wrapped indices are always in range");
            *frame = self.frames[index];
            index += 1;
            if index == capacity {
                index = 0;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_back() {
        let mut buffer = CircularBuffer::<2>::new(8);
        for i in 0..5 {
            buffer.write(0, i as f32);
            buffer.write(1, -(i as f32));
            buffer.advance();
        }
        assert_eq!(buffer.write_pos(), 5);
        // most recent frame is right behind the write cursor
        assert_eq!(buffer.read_at(0, -1), 4.0);
        assert_eq!(buffer.read_at(1, -1), -4.0);
        assert_eq!(buffer.read_at(0, -5), 0.0);
        // not yet written frames are silent
        assert_eq!(buffer.read_at(0, 0), 0.0);
        assert_eq!(buffer.read_at(0, 2), 0.0);
    }

    #[test]
    fn cursor_wraps() {
        let mut buffer = CircularBuffer::<1>::new(4);
        for i in 0..10 {
            buffer.write(0, i as f32);
            buffer.advance();
        }
        assert_eq!(buffer.write_pos(), 10 % 4);
        assert_eq!(buffer.read_at(0, -1), 9.0);
        assert_eq!(buffer.read_at(0, -4), 6.0);
        assert_eq!(buffer.read_at(0, 0), 6.0);
        assert_eq!(buffer.read_at(0, -5), 9.0);
    }

    #[test]
    fn wrapped_indices_are_in_range() {
        for capacity in [1, 2, 7, 64, 88200] {
            let mut buffer = CircularBuffer::<2>::new(capacity);
            for _ in 0..(capacity * 3 / 2) {
                buffer.advance();
            }
            for offset in [
                isize::MIN,
                isize::MIN + 1,
                -1_000_000_007,
                -(capacity as isize) - 1,
                -1,
                0,
                1,
                capacity as isize,
                1_000_000_007,
                isize::MAX,
            ] {
                let index = buffer.wrapped_index(offset);
                assert!(index < capacity, "{offset} -> {index} for capacity {capacity}");
            }
        }
    }

    #[test]
    fn copy_wrapped_frames() {
        let mut buffer = CircularBuffer::<2>::new(4);
        for i in 0..6 {
            buffer.write(0, i as f32);
            buffer.write(1, 10.0 + i as f32);
            buffer.advance();
        }
        let mut target = [[0.0; 2]; 3];
        buffer.copy_frames(-3, &mut target);
        assert_eq!(target, [[3.0, 13.0], [4.0, 14.0], [5.0, 15.0]]);

        // longer than the buffer
        let mut target = [[0.0; 2]; 6];
        buffer.copy_frames(-2, &mut target);
        assert_eq!(target.map(|f| f[0]), [4.0, 5.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn resize_and_flush() {
        let mut buffer = CircularBuffer::<2>::new(4);
        buffer.write(0, 1.0);
        buffer.advance();
        buffer.resize(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.write_pos(), 0);
        assert_eq!(buffer.read_at(0, 0), 0.0);

        buffer.resize(16);
        buffer.write(1, 1.0);
        buffer.advance();
        buffer.flush();
        assert_eq!(buffer.write_pos(), 0);
        assert!((0..16).all(|i| buffer.read_at(1, i) == 0.0));
    }
}
