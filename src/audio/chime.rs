use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

/// C-major arpeggio, one step every 100 ms.
const UPPER_STEPS: [f32; 3] = [523.25, 659.25, 783.99];
/// Same arpeggio an octave down.
const LOWER_STEPS: [f32; 3] = [261.63, 329.63, 392.00];
const STEP_SECONDS: f32 = 0.1;

const START_GAIN: f32 = 0.3;
const END_GAIN: f32 = 0.01;
pub const CHIME_SECONDS: f32 = 0.8;

/// Completion chime: two sine voices under an exponential decay, finite.
pub struct Chime {
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
    upper_phase: f32,
    lower_phase: f32,
}

impl Chime {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            num_sample: 0,
            total_samples: (sample_rate as f32 * CHIME_SECONDS) as usize,
            upper_phase: 0.0,
            lower_phase: 0.0,
        }
    }

    fn step_index(&self, t: f32) -> usize {
        ((t / STEP_SECONDS) as usize).min(UPPER_STEPS.len() - 1)
    }

    /// Envelope level at `t` seconds: START_GAIN at 0, END_GAIN at CHIME_SECONDS.
    pub fn envelope(t: f32) -> f32 {
        START_GAIN * (END_GAIN / START_GAIN).powf(t / CHIME_SECONDS)
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let step = self.step_index(t);
        let sample = (self.upper_phase.sin() + self.lower_phase.sin()) * Self::envelope(t);

        // Phase accumulators keep the frequency steps click-free
        let rate = self.sample_rate as f32;
        self.upper_phase = (self.upper_phase + TAU * UPPER_STEPS[step] / rate) % TAU;
        self.lower_phase = (self.lower_phase + TAU * LOWER_STEPS[step] / rate) % TAU;
        self.num_sample += 1;

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_samples - self.num_sample;
        (left, Some(left))
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(CHIME_SECONDS))
    }
}
