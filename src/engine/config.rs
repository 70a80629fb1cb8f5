use crate::{
    utils::{ms_to_frames, speed_from_semitones},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Static grain and mix settings of a [`FracturedEngine`](super::FracturedEngine).
///
/// All frame sizes are derived from these settings and the sample rate the engine is configured
/// with, see e.g. [`EngineConfig::grain_frames`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Length of each grain in milliseconds (1.0 - 1000.0).
    pub grain_size_ms: f32,
    /// Trigger interval relative to the grain length (0.0 - 4.0, exclusive 0).
    /// 0.5 spawns a new grain pair every half grain on average.
    pub hop_ratio: f32,
    /// Base pitch offset of the "up" grain of each pair in semitones (-24.0 - 24.0).
    pub pitch_up_semitones: f32,
    /// Base pitch offset of the "down" grain of each pair in semitones (-24.0 - 24.0).
    pub pitch_down_semitones: f32,
    /// Delay of the dry signal in milliseconds (0.0 - 1000.0).
    pub dry_delay_ms: f32,
    /// Reap finished grains every `reap_interval` frames within a block (and once at the end of
    /// each block). Only affects how long finished grain slots stay occupied, never the output.
    pub reap_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grain_size_ms: 40.0,
            hop_ratio: 0.5,
            pitch_up_semitones: 1.2,
            pitch_down_semitones: -1.2,
            dry_delay_ms: 20.0,
            reap_interval: 64,
        }
    }
}

impl EngineConfig {
    /// Random deviation of the trigger interval, relative to the base hop size.
    pub const HOP_JITTER_FRACTION: f32 = 0.30;
    /// Length of the recorded input history in seconds.
    pub const HISTORY_SECONDS: f64 = 2.0;
    /// Number of grains spawned per trigger: one pitched up, one pitched down.
    pub const GRAINS_PER_TRIGGER: usize = 2;
    /// Upper bound of the random pitch deviation in semitones.
    pub const MAX_PITCH_DEPTH: f32 = 12.0;
    /// Upper bound of the random capture offset in milliseconds.
    pub const MAX_JITTER_MS: f32 = 100.0;
    /// Bounds of the grain pair's base pitch offsets in semitones.
    pub const MAX_PITCH_OFFSET: f32 = 24.0;

    const MIN_GRAIN_FRAMES: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), Error> {
        if !(1.0..=1000.0).contains(&self.grain_size_ms) {
            return Err(Error::ParameterError(
                "Grain size must be between 1 and 1000 ms".to_string(),
            ));
        }
        if !(self.hop_ratio > 0.0 && self.hop_ratio <= 4.0) {
            return Err(Error::ParameterError(
                "Hop ratio must be greater than 0 and at most 4".to_string(),
            ));
        }
        let pitch_offsets = -Self::MAX_PITCH_OFFSET..=Self::MAX_PITCH_OFFSET;
        if !pitch_offsets.contains(&self.pitch_up_semitones)
            || !pitch_offsets.contains(&self.pitch_down_semitones)
        {
            return Err(Error::ParameterError(
                "Grain pitch offsets must be between -24 and 24 semitones".to_string(),
            ));
        }
        if !(0.0..=1000.0).contains(&self.dry_delay_ms) {
            return Err(Error::ParameterError(
                "Dry delay must be between 0 and 1000 ms".to_string(),
            ));
        }
        if self.reap_interval == 0 {
            return Err(Error::ParameterError(
                "Reap interval must be at least one frame".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of frames in the recorded input history.
    pub fn history_frames(&self, sample_rate: u32) -> usize {
        ((sample_rate as f64 * Self::HISTORY_SECONDS).floor() as usize).max(1)
    }

    /// Length of a single grain in frames.
    pub fn grain_frames(&self, sample_rate: u32) -> usize {
        (ms_to_frames(self.grain_size_ms, sample_rate).floor() as usize).max(Self::MIN_GRAIN_FRAMES)
    }

    /// Average trigger interval in frames.
    pub fn base_hop_frames(&self, sample_rate: u32) -> usize {
        ((self.grain_frames(sample_rate) as f32 * self.hop_ratio).floor() as usize).max(1)
    }

    /// Inclusive `(min, max)` range of randomized trigger intervals in frames.
    pub fn hop_range(&self, sample_rate: u32) -> (usize, usize) {
        let base_hop = self.base_hop_frames(sample_rate) as f32;
        let min_hop = ((base_hop * (1.0 - Self::HOP_JITTER_FRACTION)).floor() as usize).max(1);
        let max_hop =
            ((base_hop * (1.0 + Self::HOP_JITTER_FRACTION)).ceil() as usize).max(min_hop + 1);
        (min_hop, max_hop)
    }

    /// Dry signal read offset in frames, see [`DryWetMixer`](super::mixer::DryWetMixer).
    /// At least 1, which reads the most recent input frame.
    pub fn dry_delay_frames(&self, sample_rate: u32) -> usize {
        (ms_to_frames(self.dry_delay_ms, sample_rate).round() as usize).max(1)
    }

    /// Per grain gain, compensating the energy of overlapping grains.
    pub fn grain_gain(&self) -> f32 {
        0.7 * self.hop_ratio.sqrt()
    }

    /// Number of output frames the slowest possible grain plays until it finishes.
    pub fn max_grain_lifetime_frames(&self, sample_rate: u32) -> usize {
        let slowest_semitones =
            self.pitch_up_semitones.min(self.pitch_down_semitones) - Self::MAX_PITCH_DEPTH;
        let slowest_speed = speed_from_semitones(slowest_semitones) as f64;
        let grain_frames = self.grain_frames(sample_rate);
        (((grain_frames - 1) as f64 / slowest_speed).ceil() as usize).saturating_add(1)
    }

    /// Upper bound of simultaneously allocated grains, including finished grains which are not
    /// yet reaped.
    pub fn max_concurrent_grains(&self, sample_rate: u32) -> usize {
        let (min_hop, _) = self.hop_range(sample_rate);
        let occupied_frames = self
            .max_grain_lifetime_frames(sample_rate)
            .saturating_add(self.reap_interval);
        let triggers = occupied_frames.div_ceil(min_hop).saturating_add(1);
        triggers.saturating_mul(Self::GRAINS_PER_TRIGGER)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sizes() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.history_frames(44100), 88200);
        assert_eq!(config.grain_frames(44100), 1764);
        assert_eq!(config.base_hop_frames(44100), 882);
        assert_eq!(config.hop_range(44100), (617, 1147));
        assert_eq!(config.dry_delay_frames(44100), 882);
        assert_eq!(config.dry_delay_frames(48000), 960);
        let no_delay = EngineConfig {
            dry_delay_ms: 0.0,
            ..Default::default()
        };
        assert_eq!(no_delay.dry_delay_frames(44100), 1);
        assert!((config.grain_gain() - 0.7 * 0.5f32.sqrt()).abs() < 1e-7);
    }

    #[test]
    fn size_floors() {
        let config = EngineConfig {
            grain_size_ms: 1.0,
            hop_ratio: 0.01,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.history_frames(0), 1);
        assert_eq!(config.grain_frames(1000), 5);
        assert_eq!(config.base_hop_frames(1000), 1);
        let (min_hop, max_hop) = config.hop_range(1000);
        assert_eq!(min_hop, 1);
        assert!(max_hop > min_hop);
    }

    #[test]
    fn concurrent_grain_bound() {
        let config = EngineConfig::default();
        let lifetime = config.max_grain_lifetime_frames(44100);
        // 1764 frames played back at 2^(-13.2/12)
        assert!(lifetime > 3700 && lifetime < 3900);
        let max_grains = config.max_concurrent_grains(44100);
        assert!(max_grains >= 14);
        assert_eq!(max_grains % EngineConfig::GRAINS_PER_TRIGGER, 0);
    }

    #[test]
    fn extreme_pitch_offsets() {
        let lowest = EngineConfig {
            pitch_up_semitones: 24.0,
            pitch_down_semitones: -24.0,
            ..Default::default()
        };
        assert!(lowest.validate().is_ok());
        // 1764 frames played back at 2^(-36/12) = 1/8
        let lifetime = lowest.max_grain_lifetime_frames(44100);
        assert!(lifetime.abs_diff(1763 * 8 + 1) <= 1);
        assert!(lowest.max_concurrent_grains(44100) < 100);

        // sizing saturates instead of overflowing for configs which fail to validate
        let unbounded = EngineConfig {
            pitch_down_semitones: -1000.0,
            ..Default::default()
        };
        assert!(unbounded.validate().is_err());
        assert_eq!(unbounded.max_grain_lifetime_frames(44100), usize::MAX);
        assert!(unbounded.max_concurrent_grains(44100) > 0);
    }

    #[test]
    fn invalid_settings() {
        let invalid = [
            EngineConfig {
                grain_size_ms: 0.0,
                ..Default::default()
            },
            EngineConfig {
                hop_ratio: 0.0,
                ..Default::default()
            },
            EngineConfig {
                hop_ratio: f32::NAN,
                ..Default::default()
            },
            EngineConfig {
                pitch_up_semitones: f32::INFINITY,
                ..Default::default()
            },
            EngineConfig {
                pitch_down_semitones: -1000.0,
                ..Default::default()
            },
            EngineConfig {
                pitch_up_semitones: 24.5,
                ..Default::default()
            },
            EngineConfig {
                dry_delay_ms: -1.0,
                ..Default::default()
            },
            EngineConfig {
                reap_interval: 0,
                ..Default::default()
            },
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(Error::ParameterError(_))),
                "{config:?} should be invalid"
            );
        }
    }
}
