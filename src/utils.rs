//! Buffer and conversion helpers.

pub mod buffer;

// -------------------------------------------------------------------------------------------------

/// Convert a pitch offset in semitones to a playback speed factor (equal temperament).
#[inline]
pub fn speed_from_semitones(semitones: f32) -> f32 {
    2.0f32.powf(semitones / 12.0)
}

// -------------------------------------------------------------------------------------------------

/// Convert milliseconds to a (fractional) number of sample frames.
#[inline]
pub fn ms_to_frames(ms: f32, sample_rate: u32) -> f64 {
    ms as f64 * sample_rate as f64 / 1000.0
}

// -------------------------------------------------------------------------------------------------
