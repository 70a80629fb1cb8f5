//! The grain synthesis engine.

use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    utils::{buffer::AudioBlock, ms_to_frames},
    Error,
};

// -------------------------------------------------------------------------------------------------

mod circular;
mod config;
mod grain;
mod mixer;
mod scheduler;
mod spawner;

use circular::CircularBuffer;
use grain::GrainPool;
use mixer::DryWetMixer;
use scheduler::TriggerScheduler;
use spawner::GrainSpawner;

pub use config::EngineConfig;

// -------------------------------------------------------------------------------------------------

/// Max number of channels the engine processes. Additional channels are passed through.
pub const MAX_CHANNELS: usize = 2;

// -------------------------------------------------------------------------------------------------

/// Control parameters of a [`FracturedEngine`], applied once per processed block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockParameters {
    /// Random pitch deviation of each grain in semitones (0.0 - 12.0).
    pub pitch_depth: f32,
    /// Random capture time offset of each grain in milliseconds (0.0 - 100.0).
    pub jitter_ms: f32,
    /// Wet/dry ratio: 0.0 is dry only, 1.0 is wet only.
    pub wet_mix: f32,
}

impl Default for BlockParameters {
    fn default() -> Self {
        Self {
            pitch_depth: 3.0,
            jitter_ms: 30.0,
            wet_mix: 0.4,
        }
    }
}

impl BlockParameters {
    pub fn new(pitch_depth: f32, jitter_ms: f32, wet_mix: f32) -> Self {
        Self {
            pitch_depth,
            jitter_ms,
            wet_mix,
        }
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=EngineConfig::MAX_PITCH_DEPTH).contains(&self.pitch_depth) {
            return Err(Error::ParameterError(
                "Pitch depth must be between 0 and 12 semitones".to_string(),
            ));
        }
        if !(0.0..=EngineConfig::MAX_JITTER_MS).contains(&self.jitter_ms) {
            return Err(Error::ParameterError(
                "Jitter must be between 0 and 100 ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.wet_mix) {
            return Err(Error::ParameterError(
                "Wet mix must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a copy with all parameters clamped into their valid ranges.
    /// Non finite values are replaced by the range's lower bound.
    pub fn clamped(&self) -> Self {
        fn clamp(value: f32, max: f32) -> f32 {
            if value.is_finite() {
                value.clamp(0.0, max)
            } else {
                0.0
            }
        }
        Self {
            pitch_depth: clamp(self.pitch_depth, EngineConfig::MAX_PITCH_DEPTH),
            jitter_ms: clamp(self.jitter_ms, EngineConfig::MAX_JITTER_MS),
            wet_mix: clamp(self.wet_mix, 1.0),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Granular pitch doubler.
///
/// Records its input into a two second history, periodically spawns pairs of short Hann-windowed
/// grains from the most recent input (one pitched up, one pitched down, with random pitch and
/// timing deviations) and mixes the grains with a delayed copy of the input.
///
/// All buffers are allocated in [`Self::configure`]: [`Self::process`] never allocates, locks or
/// blocks and can be called from real-time audio threads. Random values are drawn from a single
/// engine owned generator, so engines created via [`Self::with_seed`] produce deterministic output.
pub struct FracturedEngine {
    config: EngineConfig,
    sample_rate: u32,
    history: CircularBuffer<MAX_CHANNELS>,
    scheduler: TriggerScheduler,
    spawner: GrainSpawner,
    grains: GrainPool<MAX_CHANNELS>,
    mixer: DryWetMixer,
    rng: SmallRng,
}

impl FracturedEngine {
    /// Sample rate new engines are configured with.
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Create a new engine with the default config and a randomly seeded random generator.
    pub fn new() -> Self {
        Self::with_rng(EngineConfig::default(), SmallRng::from_os_rng())
    }

    /// Create a new engine with the given config and a randomly seeded random generator.
    pub fn with_config(config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::with_rng(config, SmallRng::from_os_rng()))
    }

    /// Create a new engine with the given config and a fixed random seed.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::with_rng(config, SmallRng::seed_from_u64(seed)))
    }

    fn with_rng(config: EngineConfig, rng: SmallRng) -> Self {
        let mut engine = Self {
            config,
            sample_rate: 0,
            history: CircularBuffer::new(1),
            scheduler: TriggerScheduler::new(),
            spawner: GrainSpawner::new(),
            grains: GrainPool::new(),
            mixer: DryWetMixer::default(),
            rng,
        };
        engine.configure(Self::DEFAULT_SAMPLE_RATE);
        engine
    }

    /// The engine's static settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The sample rate the engine currently is configured for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Grain length in frames at the current sample rate.
    pub fn grain_frames(&self) -> usize {
        self.spawner.grain_length()
    }

    /// Number of preallocated grain slots.
    pub fn grain_capacity(&self) -> usize {
        self.grains.capacity()
    }

    /// Number of currently playing (or finished, but not yet reaped) grains.
    pub fn active_grains(&self) -> usize {
        self.grains.active_count()
    }

    /// Number of grains which got skipped since the last reset because all grain slots were
    /// occupied. Stays zero unless the grain capacity estimate is off.
    pub fn dropped_grains(&self) -> usize {
        self.grains.dropped_grains()
    }

    /// Number of frames the engine keeps producing audible output after its input turned silent.
    pub fn tail_frames(&self) -> usize {
        let max_jitter_frames =
            ms_to_frames(EngineConfig::MAX_JITTER_MS, self.sample_rate).ceil() as usize;
        self.config.dry_delay_frames(self.sample_rate)
            + self.grain_frames()
            + max_jitter_frames
            + self.config.max_grain_lifetime_frames(self.sample_rate)
    }

    /// (Re)initialize all buffers for the given sample rate: clears the input history, drops all
    /// grains and schedules the first grain trigger.
    ///
    /// Must be called before processing, whenever the sample rate changes. Allocates memory, so
    /// this should not be called in real-time threads.
    pub fn configure(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;

        let history_frames = self.config.history_frames(sample_rate);
        let grain_frames = self.config.grain_frames(sample_rate);
        let grain_capacity = self.config.max_concurrent_grains(sample_rate);
        let dry_delay_frames = self.config.dry_delay_frames(sample_rate);
        let hop_range = self.config.hop_range(sample_rate);

        self.history.resize(history_frames);
        self.spawner.configure(&self.config, sample_rate);
        self.grains.allocate(grain_capacity, grain_frames);
        self.mixer = DryWetMixer::new(dry_delay_frames);
        self.scheduler.configure(hop_range, &mut self.rng);

        log::debug!(
            "Configured grain engine for {sample_rate} Hz: history {history_frames}, grain \
            {grain_frames}, hop {}..={}, dry delay {dry_delay_frames} frames, {grain_capacity} \
            grain slots",
            hop_range.0,
            hop_range.1
        );
    }

    /// Clear the input history and drop all grains without changing buffer sizes.
    /// Does not allocate.
    pub fn reset(&mut self) {
        self.history.flush();
        self.grains.clear();
        self.scheduler
            .configure(self.config.hop_range(self.sample_rate), &mut self.rng);
    }

    /// Process the given block of audio in-place.
    ///
    /// Only the first [`MAX_CHANNELS`] channels are processed. Parameters get clamped into their
    /// valid ranges and are applied for the whole block.
    pub fn process<B: AudioBlock + ?Sized>(&mut self, block: &mut B, parameters: &BlockParameters) {
        let parameters = parameters.clamped();
        let channel_count = block.channel_count().min(MAX_CHANNELS);
        let frame_count = block.frame_count();
        if channel_count == 0 || frame_count == 0 {
            return;
        }

        // Record the whole block first: grains spawned in this block capture its tail
        for frame_index in 0..frame_count {
            for channel in 0..channel_count {
                self.history
                    .write(channel, block.sample(channel, frame_index));
            }
            self.history.advance();
        }

        let reap_interval = self.config.reap_interval;
        for frame_index in 0..frame_count {
            if self.scheduler.is_due() {
                self.spawner.spawn(
                    &self.history,
                    &mut self.grains,
                    parameters.pitch_depth,
                    parameters.jitter_ms,
                    &mut self.rng,
                );
                self.scheduler.reschedule(&mut self.rng);
            }
            self.scheduler.tick();

            let wet = self.grains.process();
            let dry_offset = self.mixer.dry_offset(frame_index, frame_count);
            for (channel, wet) in wet.iter().enumerate().take(channel_count) {
                let dry = self.history.read_at(channel, dry_offset);
                let output = self.mixer.mix(dry, *wet, parameters.wet_mix);
                block.set_sample(channel, frame_index, output);
            }

            if (frame_index + 1) % reap_interval == 0 {
                self.grains.reap();
            }
        }
        self.grains.reap();
    }
}

impl Default for FracturedEngine {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
