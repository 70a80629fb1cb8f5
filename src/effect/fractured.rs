use std::any::Any;

use four_cc::FourCC;

use crate::{
    effect::{Effect, EffectMessage, EffectMessagePayload, EffectTime},
    engine::{BlockParameters, EngineConfig, FracturedEngine},
    parameter::{FloatParameter, FloatParameterValue, ParameterValueUpdate},
    utils::buffer::InterleavedBlock,
    ClonableParameter, Error, Parameter,
};

// -------------------------------------------------------------------------------------------------

/// Message type for `FracturedEffect`.
#[derive(Clone, Debug)]
pub enum FracturedEffectMessage {
    /// Clear the recorded input history and stop all playing grains.
    Reset,
}

impl EffectMessage for FracturedEffectMessage {
    fn effect_name(&self) -> &'static str {
        FracturedEffect::EFFECT_NAME
    }
    fn payload(&self) -> &dyn Any {
        self
    }
}

// -------------------------------------------------------------------------------------------------

/// Granular pitch doubler effect: thickens the input with randomly pitched and timed grain pairs.
///
/// Wraps a [`FracturedEngine`] and exposes its block parameters as automatable effect parameters.
/// Processes the first two channels of the buffer; additional channels pass through unchanged.
pub struct FracturedEffect {
    channel_count: usize,
    engine: FracturedEngine,
    pitch_depth: FloatParameterValue,
    jitter: FloatParameterValue,
    wet_mix: FloatParameterValue,
}

impl FracturedEffect {
    pub const EFFECT_NAME: &str = "FracturedEffect";

    pub const PITCH_DEPTH: FloatParameter = FloatParameter::new(
        FourCC(*b"pdep"),
        "Pitch Depth",
        0.0..=EngineConfig::MAX_PITCH_DEPTH,
        3.0,
    )
    .with_unit("st");
    pub const JITTER: FloatParameter = FloatParameter::new(
        FourCC(*b"jitr"),
        "Jitter",
        0.0..=EngineConfig::MAX_JITTER_MS,
        30.0,
    )
    .with_unit("ms");
    pub const WET_MIX: FloatParameter =
        FloatParameter::new(FourCC(*b"wet_"), "Wet Mix", 0.0..=1.0, 0.4).with_unit("%");

    /// Creates a new `FracturedEffect` with default parameter values.
    pub fn new() -> Self {
        Self::with_engine(FracturedEngine::new())
    }

    /// Creates a new `FracturedEffect` with the given engine settings.
    pub fn with_config(config: EngineConfig) -> Result<Self, Error> {
        Ok(Self::with_engine(FracturedEngine::with_config(config)?))
    }

    /// Creates a new `FracturedEffect` which runs the given, e.g. seeded, engine.
    pub fn with_engine(engine: FracturedEngine) -> Self {
        let to_string_percent = |v: f32| format!("{:.2}", v * 100.0);
        let from_string_percent = |v: &str| v.parse::<f32>().map(|f| f / 100.0).ok();

        Self {
            channel_count: 0,
            engine,
            pitch_depth: FloatParameterValue::from_description(Self::PITCH_DEPTH),
            jitter: FloatParameterValue::from_description(Self::JITTER),
            wet_mix: FloatParameterValue::from_description(
                Self::WET_MIX.with_display(to_string_percent, from_string_percent),
            ),
        }
    }

    /// Creates a new `FracturedEffect` with the given parameters.
    pub fn with_parameters(pitch_depth: f32, jitter_ms: f32, wet_mix: f32) -> Self {
        let mut effect = Self::default();
        effect.pitch_depth.set_value_clamped(pitch_depth);
        effect.jitter.set_value_clamped(jitter_ms);
        effect.wet_mix.set_value_clamped(wet_mix);
        effect
    }

    /// Current parameter values as applied to the next processed buffer.
    pub fn block_parameters(&self) -> BlockParameters {
        BlockParameters::new(
            self.pitch_depth.value(),
            self.jitter.value(),
            self.wet_mix.value(),
        )
    }
}

impl Default for FracturedEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FracturedEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn parameters(&self) -> Vec<&dyn ClonableParameter> {
        vec![
            self.pitch_depth.description(),
            self.jitter.description(),
            self.wet_mix.description(),
        ]
    }

    fn initialize(
        &mut self,
        sample_rate: u32,
        channel_count: usize,
        max_frames: usize,
    ) -> Result<(), Error> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if channel_count == 0 {
            return Err(Error::InvalidChannelCount(channel_count));
        }
        self.channel_count = channel_count;
        self.engine.configure(sample_rate);

        log::info!(
            "Initialized {} with {channel_count} channels at {sample_rate} Hz \
            (max {max_frames} frames): grain {} frames, {} grain slots, tail {} frames",
            self.name(),
            self.engine.grain_frames(),
            self.engine.grain_capacity(),
            self.engine.tail_frames()
        );
        if channel_count > crate::engine::MAX_CHANNELS {
            log::warn!(
                "{}: only the first {} of {channel_count} channels get processed",
                self.name(),
                crate::engine::MAX_CHANNELS
            );
        }
        Ok(())
    }

    fn process(&mut self, output: &mut [f32], _time: &EffectTime) {
        let parameters = self.block_parameters();
        let mut block = InterleavedBlock::new(output, self.channel_count);
        self.engine.process(&mut block, &parameters);
    }

    fn process_tail(&self) -> Option<usize> {
        Some(self.engine.tail_frames())
    }

    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        match id {
            _ if id == Self::PITCH_DEPTH.id() => self.pitch_depth.apply_update(value),
            _ if id == Self::JITTER.id() => self.jitter.apply_update(value),
            _ if id == Self::WET_MIX.id() => self.wet_mix.apply_update(value),
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown parameter: '{id}' for effect '{}'",
                    self.name()
                )))
            }
        }
        Ok(())
    }

    fn process_message(&mut self, message: &EffectMessagePayload) -> Result<(), Error> {
        if let Some(message) = message.payload().downcast_ref::<FracturedEffectMessage>() {
            match message {
                FracturedEffectMessage::Reset => self.engine.reset(),
            }
            Ok(())
        } else {
            Err(Error::ParameterError(
                "FracturedEffect: Invalid/unknown message payload".to_owned(),
            ))
        }
    }
}

// -------------------------------------------------------------------------------------------------
