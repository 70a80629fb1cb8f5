//! Renders a wav file through the fractured pitch doubler effect.
//!
//! Usage: `cargo run --example render-file -- INPUT.wav -o OUTPUT.wav [-d DEPTH] [-j JITTER] [-w WET]`

use std::path::{Path, PathBuf};

use arg::{parse_args, Args};

use fractured::{effects::FracturedEffect, BlockParameters, Effect, EffectTime};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const BLOCK_FRAMES: usize = 512;

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Path of the rendered wav file. Defaults to the input path with a \"-fractured\" suffix.
    output_path: Option<PathBuf>,
    #[arg(short = "d", long = "depth")]
    /// Random pitch deviation in semitones (0 - 12).
    pitch_depth: Option<f32>,
    #[arg(short = "j", long = "jitter")]
    /// Random grain timing deviation in milliseconds (0 - 100).
    jitter_ms: Option<f32>,
    #[arg(short = "w", long = "wet")]
    /// Wet/dry mix (0 - 1).
    wet_mix: Option<f32>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    log_level: Option<log::Level>,
    /// Input wav file.
    input_path: PathBuf,
}

// -------------------------------------------------------------------------------------------------

/// Read all samples of the given wav file as interleaved `f32` samples.
fn read_wav(path: &Path) -> Result<(hound::WavSpec, Vec<f32>), hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((spec, samples))
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()?;

    let (spec, mut samples) = read_wav(&args.input_path)?;
    let channel_count = spec.channels as usize;
    log::info!(
        "Read {} frames with {channel_count} channels at {} Hz from '{}'",
        samples.len() / channel_count.max(1),
        spec.sample_rate,
        args.input_path.display()
    );

    let defaults = BlockParameters::default();
    let mut effect = FracturedEffect::with_parameters(
        args.pitch_depth.unwrap_or(defaults.pitch_depth),
        args.jitter_ms.unwrap_or(defaults.jitter_ms),
        args.wet_mix.unwrap_or(defaults.wet_mix),
    );
    effect.initialize(spec.sample_rate, channel_count, BLOCK_FRAMES)?;

    // append silence to render the effect's tail
    let tail_frames = effect.process_tail().unwrap_or(0);
    samples.resize(samples.len() + tail_frames * channel_count, 0.0);

    let mut time = EffectTime::default();
    for block in samples.chunks_mut(BLOCK_FRAMES * channel_count) {
        #[cfg(feature = "assert-allocs")]
        assert_no_alloc::assert_no_alloc(|| effect.process(block, &time));
        #[cfg(not(feature = "assert-allocs"))]
        effect.process(block, &time);
        time = time.advanced(block.len() / channel_count);
    }

    let output_path = args.output_path.clone().unwrap_or_else(|| {
        let stem = args
            .input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        args.input_path.with_file_name(format!("{stem}-fractured.wav"))
    });
    let output_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output_path, output_spec)?;
    for sample in &samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    log::info!(
        "Wrote {} frames to '{}'",
        time.pos_in_frames,
        output_path.display()
    );
    Ok(())
}
