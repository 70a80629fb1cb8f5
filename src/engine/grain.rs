//! Grain playback and the preallocated grain pool.

// -------------------------------------------------------------------------------------------------

/// A single grain: a windowed snapshot of recorded audio, played back at its own speed.
///
/// Grains live in preallocated [`GrainPool`] slots. The snapshot, speed and gain are set when
/// the grain gets spawned; afterwards only the playback position and finished state change.
#[derive(Debug, Clone)]
pub(crate) struct Grain<const CHANNELS: usize> {
    /// Captured, windowed audio frames.
    frames: Box<[[f32; CHANNELS]]>,
    /// Playback speed multiplier (> 0).
    speed: f32,
    /// Linear gain applied to the interpolated snapshot.
    gain: f32,
    /// Number of output frames this grain has been played.
    position: f32,
    /// Set as soon as the read position passed the end of the snapshot.
    finished: bool,
}

impl<const CHANNELS: usize> Grain<CHANNELS> {
    /// Create a new, finished grain with a snapshot buffer of the given length.
    pub fn new(length: usize) -> Self {
        Self {
            frames: vec![[0.0; CHANNELS]; length].into_boxed_slice(),
            speed: 1.0,
            gain: 1.0,
            position: 0.0,
            finished: true,
        }
    }

    /// Restart the grain with new playback properties. The snapshot content must be written via
    /// [`Self::frames_mut`] before the grain gets processed.
    pub fn start(&mut self, speed: f32, gain: f32) {
        debug_assert!(speed > 0.0, "Grain speed must be positive");
        self.speed = speed;
        self.gain = gain;
        self.position = 0.0;
        self.finished = false;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[allow(unused)]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    #[allow(unused)]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    #[allow(unused)]
    pub fn position(&self) -> f32 {
        self.position
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    #[allow(unused)]
    pub fn frames(&self) -> &[[f32; CHANNELS]] {
        &self.frames
    }

    #[inline]
    pub fn frames_mut(&mut self) -> &mut [[f32; CHANNELS]] {
        &mut self.frames
    }

    /// Add the grain's current, linearly interpolated output to the given frame.
    /// Marks the grain as finished when the read position passed the snapshot's end.
    #[inline]
    pub fn process(&mut self, output: &mut [f32; CHANNELS]) {
        if self.finished {
            return;
        }
        let read_pos = self.position * self.speed;
        let index = read_pos as usize;
        let fraction = read_pos - index as f32;
        if index + 1 < self.frames.len() {
            let frame0 = &self.frames[index];
            let frame1 = &self.frames[index + 1];
            for ((out, s0), s1) in output.iter_mut().zip(frame0).zip(frame1) {
                *out += self.gain * (s0 + fraction * (s1 - s0));
            }
        } else {
            self.finished = true;
        }
    }

    /// Move the playback position by one output frame.
    #[inline]
    pub fn advance(&mut self) {
        self.position += 1.0;
    }
}

// -------------------------------------------------------------------------------------------------

/// Fixed capacity pool of grains.
///
/// All grain slots and index lists get allocated in [`Self::allocate`], so spawning, processing
/// and reaping grains never allocates. Active grains are processed in the order they got spawned.
#[derive(Debug, Default)]
pub(crate) struct GrainPool<const CHANNELS: usize> {
    slots: Vec<Grain<CHANNELS>>,
    free_slots: Vec<usize>,
    active_slots: Vec<usize>,
    dropped_grains: usize,
}

impl<const CHANNELS: usize> GrainPool<CHANNELS> {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)allocate `capacity` grain slots with snapshots of `grain_length` frames.
    /// Drops all active grains.
    pub fn allocate(&mut self, capacity: usize, grain_length: usize) {
        self.slots = (0..capacity).map(|_| Grain::new(grain_length)).collect();
        self.free_slots = Vec::with_capacity(capacity);
        self.active_slots = Vec::with_capacity(capacity);
        self.clear();
    }

    /// Stop all grains and release their slots.
    pub fn clear(&mut self) {
        self.active_slots.clear();
        self.free_slots.clear();
        // hand out low slot indices first
        self.free_slots.extend((0..self.slots.len()).rev());
        for grain in &mut self.slots {
            grain.finished = true;
        }
        self.dropped_grains = 0;
    }

    /// Total number of grain slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots: playing grains plus finished grains which are not yet reaped.
    pub fn active_count(&self) -> usize {
        self.active_slots.len()
    }

    /// Number of grains which could not be spawned since the last clear, because all slots
    /// were occupied.
    pub fn dropped_grains(&self) -> usize {
        self.dropped_grains
    }

    /// Iterate over all occupied slots in spawn order.
    #[allow(unused)]
    pub fn active_grains(&self) -> impl Iterator<Item = &Grain<CHANNELS>> {
        self.active_slots.iter().map(|&index| &self.slots[index])
    }

    /// Acquire a free slot and start a grain in it. The caller must fill the returned grain's
    /// snapshot frames. Returns `None` when all slots are occupied.
    pub fn spawn(&mut self, speed: f32, gain: f32) -> Option<&mut Grain<CHANNELS>> {
        match self.free_slots.pop() {
            Some(index) => {
                debug_assert!(self.active_slots.len() < self.active_slots.capacity());
                self.active_slots.push(index);
                let grain = &mut self.slots[index];
                grain.start(speed, gain);
                Some(grain)
            }
            None => {
                self.dropped_grains += 1;
                None
            }
        }
    }

    /// Render one output frame: sum up all active grains and advance them.
    #[inline]
    pub fn process(&mut self) -> [f32; CHANNELS] {
        let mut output = [0.0; CHANNELS];
        for &index in &self.active_slots {
            let grain = &mut self.slots[index];
            grain.process(&mut output);
            grain.advance();
        }
        output
    }

    /// Release the slots of all finished grains.
    pub fn reap(&mut self) {
        let slots = &self.slots;
        let free_slots = &mut self.free_slots;
        self.active_slots.retain(|&index| {
            if slots[index].is_finished() {
                free_slots.push(index);
                false
            } else {
                true
            }
        });
    }
}

// -------------------------------------------------------------------------------------------------
