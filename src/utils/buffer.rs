//! Channel/frame access for planar and interleaved audio buffers.

// -------------------------------------------------------------------------------------------------

/// A block of audio samples which gets processed in-place.
///
/// Implemented for planar channel slices (`[&mut [f32]]`, `[Vec<f32>]`) and for interleaved
/// buffers via [`InterleavedBlock`].
pub trait AudioBlock {
    /// Number of channels in the block.
    fn channel_count(&self) -> usize;
    /// Number of sample frames in the block.
    fn frame_count(&self) -> usize;

    /// Read a single sample. `channel` and `frame` must be in range.
    fn sample(&self, channel: usize, frame: usize) -> f32;
    /// Write a single sample. `channel` and `frame` must be in range.
    fn set_sample(&mut self, channel: usize, frame: usize, value: f32);
}

/// Planar buffers: one slice per channel. When channel slices have different lengths, the
/// shortest one defines the frame count.
impl<C> AudioBlock for [C]
where
    C: AsRef<[f32]> + AsMut<[f32]>,
{
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn frame_count(&self) -> usize {
        self.iter()
            .map(|channel| channel.as_ref().len())
            .min()
            .unwrap_or(0)
    }

    #[inline]
    fn sample(&self, channel: usize, frame: usize) -> f32 {
        self[channel].as_ref()[frame]
    }

    #[inline]
    fn set_sample(&mut self, channel: usize, frame: usize, value: f32) {
        self[channel].as_mut()[frame] = value;
    }
}

// -------------------------------------------------------------------------------------------------

/// Wraps an interleaved sample buffer with the given channel layout as [`AudioBlock`].
///
/// Trailing samples which do not form a complete frame are ignored.
#[derive(Debug)]
pub struct InterleavedBlock<'a> {
    buffer: &'a mut [f32],
    channel_count: usize,
}

impl<'a> InterleavedBlock<'a> {
    pub fn new(buffer: &'a mut [f32], channel_count: usize) -> Self {
        Self {
            buffer,
            channel_count,
        }
    }
}

impl AudioBlock for InterleavedBlock<'_> {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn frame_count(&self) -> usize {
        if self.channel_count > 0 {
            self.buffer.len() / self.channel_count
        } else {
            0
        }
    }

    #[inline]
    fn sample(&self, channel: usize, frame: usize) -> f32 {
        debug_assert!(channel < self.channel_count);
        self.buffer[frame * self.channel_count + channel]
    }

    #[inline]
    fn set_sample(&mut self, channel: usize, frame: usize, value: f32) {
        debug_assert!(channel < self.channel_count);
        self.buffer[frame * self.channel_count + channel] = value;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_block() {
        let mut left = vec![1.0, 2.0, 3.0, 4.0];
        let mut right = vec![4.0, 3.0, 2.0];
        let mut channels = [left.as_mut_slice(), right.as_mut_slice()];
        let block = &mut channels[..];

        assert_eq!(block.channel_count(), 2);
        assert_eq!(block.frame_count(), 3);
        assert_eq!(block.sample(0, 1), 2.0);
        assert_eq!(block.sample(1, 2), 2.0);

        block.set_sample(1, 0, -1.0);
        assert_eq!(right[0], -1.0);
    }

    #[test]
    fn planar_vec_block() {
        let mut channels = vec![vec![0.0f32; 8]];
        let block = channels.as_mut_slice();
        assert_eq!(block.channel_count(), 1);
        assert_eq!(block.frame_count(), 8);

        let empty: &mut [Vec<f32>] = &mut [];
        assert_eq!(empty.frame_count(), 0);
    }

    #[test]
    fn interleaved_block() {
        let mut interleaved = vec![1.0, 4.0, 2.0, 3.0, 3.0, 2.0, 4.0];
        let mut block = InterleavedBlock::new(&mut interleaved, 2);

        assert_eq!(block.channel_count(), 2);
        assert_eq!(block.frame_count(), 3);
        assert_eq!(block.sample(0, 2), 3.0);
        assert_eq!(block.sample(1, 1), 3.0);

        block.set_sample(1, 2, 0.5);
        assert_eq!(interleaved[5], 0.5);

        assert_eq!(InterleavedBlock::new(&mut [0.0; 4], 0).frame_count(), 0);
    }
}
