//! Grain capture: copies windowed snapshots of the recorded input into new grains.

use rand::Rng;

use super::{circular::CircularBuffer, config::EngineConfig, grain::GrainPool};
use crate::utils::{ms_to_frames, speed_from_semitones};

// -------------------------------------------------------------------------------------------------

/// Hann window value for frame `n` of a window with `len` frames.
///
/// Zero at the first and last frame, one in the center. Windows with a single frame are flat.
#[inline]
pub(crate) fn hann_window(n: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - (std::f32::consts::TAU * n as f32 / (len - 1) as f32).cos())
}

// -------------------------------------------------------------------------------------------------

/// Spawns a pitched up and a pitched down grain per trigger.
///
/// Each grain copies the most recent `grain_length` frames from the input history (shifted by a
/// random jitter offset) and applies a precomputed Hann window to the copy.
#[derive(Debug, Clone)]
pub(crate) struct GrainSpawner {
    sample_rate: u32,
    semitones: [f32; EngineConfig::GRAINS_PER_TRIGGER],
    gain: f32,
    window: Vec<f32>,
}

impl GrainSpawner {
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            semitones: [0.0; EngineConfig::GRAINS_PER_TRIGGER],
            gain: 1.0,
            window: Vec::new(),
        }
    }

    /// Apply config and sample rate and recompute the grain window.
    pub fn configure(&mut self, config: &EngineConfig, sample_rate: u32) {
        let grain_length = config.grain_frames(sample_rate);
        self.sample_rate = sample_rate;
        self.semitones = [config.pitch_up_semitones, config.pitch_down_semitones];
        self.gain = config.grain_gain();
        self.window = (0..grain_length)
            .map(|n| hann_window(n, grain_length))
            .collect();
    }

    /// Grain length in frames.
    pub fn grain_length(&self) -> usize {
        self.window.len()
    }

    /// Spawn a grain pair into the given pool, reading from the given input history.
    ///
    /// `pitch_depth` randomizes each grain's base pitch by up to ± the given semitones.
    /// `jitter_ms` randomly moves the capture start by up to ± the given milliseconds.
    ///
    /// Returns the number of spawned grains, which is less than two when the pool ran out of
    /// free slots.
    pub fn spawn<const CHANNELS: usize>(
        &self,
        history: &CircularBuffer<CHANNELS>,
        pool: &mut GrainPool<CHANNELS>,
        pitch_depth: f32,
        jitter_ms: f32,
        rng: &mut impl Rng,
    ) -> usize {
        let grain_length = self.grain_length();
        let max_jitter_bound = history.capacity().saturating_sub(grain_length + 1) as f32;
        let max_jitter =
            (ms_to_frames(jitter_ms, self.sample_rate) as f32).clamp(0.0, max_jitter_bound);

        let mut spawned = 0;
        for base_semitones in self.semitones {
            let random_semitones = (rng.random::<f32>() * 2.0 - 1.0) * pitch_depth;
            let speed = speed_from_semitones(base_semitones + random_semitones);

            let jitter =
                ((rng.random::<f32>() * 2.0 - 1.0) * max_jitter).clamp(-max_jitter, max_jitter);
            // capture the frames right behind the write cursor, shifted by jitter
            let offset = -(grain_length as isize) - jitter.round() as isize;

            if let Some(grain) = pool.spawn(speed, self.gain) {
                let frames = grain.frames_mut();
                debug_assert_eq!(frames.len(), grain_length, "Unexpected grain slot size");
                history.copy_frames(offset, frames);
                for (frame, window) in frames.iter_mut().zip(&self.window) {
                    for sample in frame.iter_mut() {
                        *sample *= window;
                    }
                }
                spawned += 1;
            }
        }
        spawned
    }
}

impl Default for GrainSpawner {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    #[test]
    fn hann_window_shape() {
        for len in [2, 5, 64, 1764, 1765] {
            assert!(hann_window(0, len).abs() < 1e-6);
            assert!(hann_window(len - 1, len).abs() < 1e-6);
            for n in 0..len {
                let value = hann_window(n, len);
                assert!((0.0..=1.0).contains(&value));
                assert!((value - hann_window(len - 1 - n, len)).abs() < 1e-5);
            }
        }
        for len in [3, 5, 65, 1765] {
            assert!((hann_window((len - 1) / 2, len) - 1.0).abs() < 1e-6);
        }
        assert_eq!(hann_window(0, 1), 1.0);
        assert_eq!(hann_window(0, 0), 1.0);
    }

    fn setup(sample_rate: u32) -> (EngineConfig, GrainSpawner, CircularBuffer<2>, GrainPool<2>) {
        let config = EngineConfig::default();
        let mut spawner = GrainSpawner::new();
        spawner.configure(&config, sample_rate);
        let history = CircularBuffer::new(config.history_frames(sample_rate));
        let mut pool = GrainPool::new();
        pool.allocate(
            config.max_concurrent_grains(sample_rate),
            config.grain_frames(sample_rate),
        );
        (config, spawner, history, pool)
    }

    #[test]
    fn fixed_pitch_pair() {
        let (config, spawner, history, mut pool) = setup(44100);
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..4 {
            assert_eq!(spawner.spawn(&history, &mut pool, 0.0, 0.0, &mut rng), 2);
        }
        let speeds = pool.active_grains().map(|g| g.speed()).collect::<Vec<_>>();
        assert_eq!(speeds.len(), 8);
        for pair in speeds.chunks(2) {
            assert_eq!(pair[0], 2.0f32.powf(1.2 / 12.0));
            assert_eq!(pair[1], 2.0f32.powf(-1.2 / 12.0));
        }
        assert!(pool
            .active_grains()
            .all(|g| g.gain() == config.grain_gain() && g.len() == 1764));
    }

    #[test]
    fn random_pitch_stays_in_depth() {
        let (_, spawner, history, mut pool) = setup(44100);
        let mut rng = SmallRng::seed_from_u64(7);
        let depth = 3.0;
        for _ in 0..100 {
            spawner.spawn(&history, &mut pool, depth, 30.0, &mut rng);
            for (index, grain) in pool.active_grains().enumerate() {
                let base = if index % 2 == 0 { 1.2 } else { -1.2 };
                let semitones = 12.0 * grain.speed().log2();
                assert!(
                    (semitones - base).abs() <= depth + 1e-3,
                    "{semitones} is out of range"
                );
            }
            pool.clear();
        }
    }

    #[test]
    fn captures_windowed_history() {
        let (_, spawner, mut history, mut pool) = setup(1000);
        // constant signal: snapshot equals the window
        for _ in 0..500 {
            history.write(0, 1.0);
            history.write(1, -0.5);
            history.advance();
        }
        let mut rng = SmallRng::seed_from_u64(3);
        spawner.spawn(&history, &mut pool, 0.0, 0.0, &mut rng);
        let grain_length = spawner.grain_length();
        assert_eq!(grain_length, 40);
        for grain in pool.active_grains() {
            for (n, frame) in grain.frames().iter().enumerate() {
                let window = hann_window(n, grain_length);
                assert_eq!(frame[0], window);
                assert_eq!(frame[1], -0.5 * window);
            }
        }
    }

    #[test]
    fn capture_offset_follows_write_cursor() {
        let (_, spawner, mut history, mut pool) = setup(1000);
        // single impulse, 10 frames behind the write cursor
        for n in 0..200 {
            history.write(0, if n == 189 { 1.0 } else { 0.0 });
            history.write(1, 0.0);
            history.advance();
        }
        let mut rng = SmallRng::seed_from_u64(3);
        spawner.spawn(&history, &mut pool, 0.0, 0.0, &mut rng);
        let grain_length = spawner.grain_length();
        for grain in pool.active_grains() {
            let impulse_index = grain_length - 11;
            for (n, frame) in grain.frames().iter().enumerate() {
                if n == impulse_index {
                    assert_eq!(frame[0], hann_window(n, grain_length));
                } else {
                    assert_eq!(frame[0], 0.0);
                }
            }
        }
    }

    #[test]
    fn jitter_is_bounded_by_history() {
        let config = EngineConfig::default();
        let mut spawner = GrainSpawner::new();
        spawner.configure(&config, 100);
        let grain_length = spawner.grain_length();
        assert_eq!(grain_length, 5);

        // tiny history: 100 ms jitter gets clamped to 8 - 5 - 1 = 2 frames
        let mut history = CircularBuffer::<2>::new(8);
        for n in 0..8 {
            history.write(0, n as f32);
            history.advance();
        }
        let mut pool = GrainPool::new();
        pool.allocate(2, grain_length);
        let mut rng = SmallRng::seed_from_u64(11);
        let mut center_values = Vec::new();
        for _ in 0..200 {
            assert_eq!(spawner.spawn(&history, &mut pool, 0.0, 100.0, &mut rng), 2);
            // the window is 1 at the center frame, so it reveals the capture start
            center_values.extend(pool.active_grains().map(|g| g.frames()[2][0]));
            pool.clear();
        }
        assert!(center_values.iter().all(|v| (3.0..=7.0).contains(v)));
        assert!(center_values.contains(&3.0) && center_values.contains(&7.0));
    }

    #[test]
    fn drops_grains_when_pool_is_exhausted() {
        let (_, spawner, history, _) = setup(44100);
        let mut pool = GrainPool::new();
        pool.allocate(3, spawner.grain_length());
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(spawner.spawn(&history, &mut pool, 12.0, 100.0, &mut rng), 2);
        assert_eq!(spawner.spawn(&history, &mut pool, 12.0, 100.0, &mut rng), 1);
        assert_eq!(pool.dropped_grains(), 1);
        assert_eq!(pool.active_count(), 3);
    }
}
