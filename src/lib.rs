#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod effect;
mod engine;
mod error;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use engine::{BlockParameters, EngineConfig, FracturedEngine, MAX_CHANNELS};

pub use effect::{Effect, EffectMessage, EffectMessagePayload, EffectTime};

pub use parameter::{
    ClonableParameter, FloatParameter, FloatParameterValue, Parameter, ParameterType,
    ParameterValueUpdate,
};

// public mods
pub mod utils;

pub mod effects {
    //! Effect wrappers for use in effect chains.

    pub use super::effect::fractured::{FracturedEffect, FracturedEffectMessage};
}

// -------------------------------------------------------------------------------------------------

// makes `assert_no_alloc` checks in tests effective
#[cfg(all(test, feature = "assert-allocs"))]
#[global_allocator]
static ALLOCATOR: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;
