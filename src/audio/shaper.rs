use rodio::Source;
use serde::Serialize;
use std::f32::consts::{PI, TAU};
use std::time::Duration;

use super::noise::{NoiseBuffer, NoiseFamily};

/// Output level of the ambient gain stage at 100% volume.
pub const AMBIENT_HEADROOM: f32 = 0.3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff_hz: f32,
    pub q: f32,
}

/// Slow sinusoidal wobble applied to the gain stage.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModulatorSpec {
    pub rate_hz: f32,
    pub depth: f32,
}

/// Everything between the looped buffer and the gain stage.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub filter: Option<FilterSpec>,
    pub modulator: Option<ModulatorSpec>,
}

pub fn shape_for(family: NoiseFamily) -> Shape {
    let filter = |kind, cutoff_hz, q| Some(FilterSpec { kind, cutoff_hz, q });
    let wobble = |rate_hz| Some(ModulatorSpec { rate_hz, depth: 0.3 });

    match family {
        NoiseFamily::Pink => Shape::default(),
        NoiseFamily::Rain => Shape {
            filter: filter(FilterKind::LowPass, 1200.0, 0.5),
            modulator: None,
        },
        NoiseFamily::Forest => Shape {
            filter: filter(FilterKind::LowPass, 800.0, 1.0),
            modulator: None,
        },
        NoiseFamily::Ocean => Shape {
            filter: filter(FilterKind::LowPass, 400.0, 2.0),
            modulator: wobble(0.1),
        },
        NoiseFamily::Fire => Shape {
            filter: filter(FilterKind::HighPass, 100.0, 0.5),
            modulator: wobble(0.3),
        },
        NoiseFamily::Wind => Shape {
            filter: filter(FilterKind::BandPass, 600.0, 0.8),
            modulator: wobble(0.15),
        },
    }
}

/// Gain-stage level for a 0..=100 volume setting.
pub fn ambient_gain(volume_percent: u8) -> f32 {
    f32::from(volume_percent.min(100)) / 100.0 * AMBIENT_HEADROOM
}

/// Second-order IIR section using the RBJ cookbook coefficients.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(spec: FilterSpec, sample_rate: u32) -> Self {
        // Keep the cutoff below Nyquist so low sample rates stay stable
        let nyquist = sample_rate as f32 / 2.0;
        let cutoff = spec.cutoff_hz.min(nyquist * 0.99).max(f32::MIN_POSITIVE);
        let q = spec.q.max(0.01);

        let w = 2.0 * PI * cutoff / sample_rate as f32;
        let cos_w = w.cos();
        let alpha = w.sin() / (2.0 * q);

        let (b0, b1, b2) = match spec.kind {
            FilterKind::LowPass => ((1.0 - cos_w) / 2.0, 1.0 - cos_w, (1.0 - cos_w) / 2.0),
            FilterKind::HighPass => ((1.0 + cos_w) / 2.0, -(1.0 + cos_w), (1.0 + cos_w) / 2.0),
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

#[derive(Debug, Clone)]
struct Lfo {
    spec: ModulatorSpec,
    phase: f32,
    step: f32,
}

impl Lfo {
    fn new(spec: ModulatorSpec, sample_rate: u32) -> Self {
        Self {
            spec,
            phase: 0.0,
            step: TAU * spec.rate_hz / sample_rate as f32,
        }
    }

    fn next_gain(&mut self) -> f32 {
        let gain = 1.0 + self.spec.depth * self.phase.sin();
        self.phase += self.step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        gain
    }
}

/// Infinite mono source: the loop window played end to end, through the
/// family's filter and modulator. The final gain stage is applied by the sink.
pub struct ShapedVoice {
    buffer: NoiseBuffer,
    position: usize,
    filter: Option<Biquad>,
    lfo: Option<Lfo>,
}

impl ShapedVoice {
    pub fn new(buffer: NoiseBuffer, shape: Shape) -> Self {
        let sample_rate = buffer.sample_rate();
        Self {
            filter: shape.filter.map(|spec| Biquad::new(spec, sample_rate)),
            lfo: shape.modulator.map(|spec| Lfo::new(spec, sample_rate)),
            buffer,
            position: 0,
        }
    }

    pub fn for_family(family: NoiseFamily, buffer: NoiseBuffer) -> Self {
        Self::new(buffer, shape_for(family))
    }
}

impl Iterator for ShapedVoice {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            return None;
        }

        let raw = self.buffer.samples()[self.position];
        self.position = (self.position + 1) % self.buffer.len();

        let filtered = match self.filter.as_mut() {
            Some(filter) => filter.process(raw),
            None => raw,
        };
        let modulated = match self.lfo.as_mut() {
            Some(lfo) => filtered * lfo.next_gain(),
            None => filtered,
        };

        Some(modulated)
    }
}

impl Source for ShapedVoice {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
