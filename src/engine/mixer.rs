//! Wet/dry mixing and output limiting.

// -------------------------------------------------------------------------------------------------

/// Soft saturate a sample with `tanh` and hard clip it to `-1.0..=1.0`.
/// NaNs, e.g. from infinite input samples, are muted.
#[inline]
pub(crate) fn limit(sample: f32) -> f32 {
    let saturated = sample.tanh();
    if saturated.is_nan() {
        0.0
    } else {
        saturated.clamp(-1.0, 1.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Mixes the delayed dry input with the grains' wet output.
#[derive(Debug, Clone, Default)]
pub(crate) struct DryWetMixer {
    dry_delay_frames: usize,
}

impl DryWetMixer {
    pub fn new(dry_delay_frames: usize) -> Self {
        Self { dry_delay_frames }
    }

    #[allow(unused)]
    pub fn dry_delay_frames(&self) -> usize {
        self.dry_delay_frames
    }

    /// Read offset of the dry sample for frame `frame_index` of a block with `frame_count`
    /// frames, relative to the history's write cursor after the whole block got recorded.
    ///
    /// The input frame itself sits at offset `-(frame_count - frame_index)`, so the dry signal
    /// lags the input by `dry_delay_frames - 1` frames.
    #[inline]
    pub fn dry_offset(&self, frame_index: usize, frame_count: usize) -> isize {
        debug_assert!(frame_index < frame_count);
        let frames_ahead = frame_count - 1 - frame_index;
        -((self.dry_delay_frames + frames_ahead) as isize)
    }

    /// Crossfade dry and wet and limit the result.
    #[inline]
    pub fn mix(&self, dry: f32, wet: f32, wet_mix: f32) -> f32 {
        limit((1.0 - wet_mix) * dry + wet_mix * wet)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_output() {
        for sample in [-1e9, -10.0, -1.0, -0.3, 0.0, 0.3, 1.0, 10.0, 1e9] {
            let limited = limit(sample);
            assert!((-1.0..=1.0).contains(&limited));
            assert_eq!(limited.signum(), sample.signum());
        }
        assert_eq!(limit(f32::INFINITY), 1.0);
        assert_eq!(limit(f32::NEG_INFINITY), -1.0);
        assert!((limit(0.001) - 0.001).abs() < 1e-6);
        assert_eq!(limit(f32::NAN), 0.0);
        assert_eq!(limit(f32::INFINITY * 0.0), 0.0);
    }

    #[test]
    fn mixes_dry_and_wet() {
        let mixer = DryWetMixer::new(882);
        assert_eq!(mixer.mix(0.5, 0.9, 0.0), limit(0.5));
        assert_eq!(mixer.mix(0.5, 0.2, 1.0), limit(0.2));
        assert_eq!(mixer.mix(0.4, 0.2, 0.5), limit(0.3));
    }

    #[test]
    fn dry_offset_is_continuous() {
        let mixer = DryWetMixer::new(10);
        // last frame of a block reads exactly dry delay frames behind the cursor
        assert_eq!(mixer.dry_offset(63, 64), -10);
        assert_eq!(mixer.dry_offset(0, 64), -73);
        assert_eq!(mixer.dry_offset(0, 1), -10);
        // the most recently recorded frame
        assert_eq!(DryWetMixer::new(1).dry_offset(0, 1), -1);
    }
}
