use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by fractured.
///
/// Errors are only reported from setup functions. Audio processing itself never fails.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    InvalidSampleRate(u32),
    InvalidChannelCount(usize),
    ParameterError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleRate(sample_rate) => {
                write!(f, "Invalid sample rate: {sample_rate}")
            }
            Self::InvalidChannelCount(channel_count) => {
                write!(f, "Invalid channel count: {channel_count}")
            }
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
        }
    }
}
