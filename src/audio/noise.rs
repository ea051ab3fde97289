use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Length of one generated loop window.
pub const BUFFER_SECONDS: f32 = 2.0;

const FOREST_CHIRP_HZ: f32 = 2600.0;

/// Selects both the generation algorithm and the filter chain of an ambient voice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NoiseFamily {
    #[default]
    Pink,
    Rain,
    Forest,
    Fire,
    Ocean,
    Wind,
}

impl NoiseFamily {
    pub const ALL: [NoiseFamily; 6] = [
        NoiseFamily::Pink,
        NoiseFamily::Rain,
        NoiseFamily::Forest,
        NoiseFamily::Fire,
        NoiseFamily::Ocean,
        NoiseFamily::Wind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseFamily::Pink => "pink",
            NoiseFamily::Rain => "rain",
            NoiseFamily::Forest => "forest",
            NoiseFamily::Fire => "fire",
            NoiseFamily::Ocean => "ocean",
            NoiseFamily::Wind => "wind",
        }
    }
}

impl fmt::Display for NoiseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseFamily {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoiseFamily::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown sound family: {s}"))
    }
}

/// Immutable loop window of mono samples. Cloning shares the samples.
#[derive(Debug, Clone)]
pub struct NoiseBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl NoiseBuffer {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Number of samples in one loop window at `sample_rate`.
pub fn buffer_len(sample_rate: u32) -> usize {
    (sample_rate as f32 * BUFFER_SECONDS) as usize
}

/// Generates a fresh loop window for `family`, seeded from the thread RNG.
pub fn generate_fresh(family: NoiseFamily, sample_rate: u32) -> NoiseBuffer {
    generate(family, buffer_len(sample_rate), sample_rate, rand::random())
}

/// Generates `len` samples of `family`. Recursive filter state lives only for
/// the duration of this call, so equal seeds give equal buffers.
pub fn generate(family: NoiseFamily, len: usize, sample_rate: u32, seed: u64) -> NoiseBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples: Vec<f32> = match family {
        NoiseFamily::Pink => pink(&mut rng, len),
        NoiseFamily::Rain => rain(&mut rng, len),
        NoiseFamily::Forest => forest(&mut rng, len, sample_rate),
        NoiseFamily::Fire => fire(&mut rng, len),
        NoiseFamily::Ocean => ocean(&mut rng, len),
        NoiseFamily::Wind => wind(&mut rng, len),
    };

    NoiseBuffer::from_samples(samples, sample_rate)
}

fn white(rng: &mut StdRng) -> f32 {
    rng.gen_range(-1.0..1.0)
}

/// Paul Kellet's refined pink filter: six leaky poles plus a one-sample
/// delayed white term.
fn pink(rng: &mut StdRng, len: usize) -> Vec<f32> {
    let (mut b0, mut b1, mut b2, mut b3, mut b4, mut b5, mut b6) =
        (0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32);

    (0..len)
        .map(|_| {
            let w = white(rng);
            b0 = 0.99886 * b0 + w * 0.0555179;
            b1 = 0.99332 * b1 + w * 0.0750759;
            b2 = 0.969 * b2 + w * 0.153852;
            b3 = 0.8665 * b3 + w * 0.3104856;
            b4 = 0.55 * b4 + w * 0.5329522;
            b5 = -0.7616 * b5 - w * 0.016898;
            let out = (b0 + b1 + b2 + b3 + b4 + b5 + b6 + w * 0.5362) * 0.11;
            b6 = w * 0.115926;
            out
        })
        .collect()
}

fn rain(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len)
        .map(|_| {
            // Occasional droplet transient
            let amplitude = if rng.gen_bool(0.02) { 0.6 } else { 0.3 };
            white(rng) * amplitude
        })
        .collect()
}

fn forest(rng: &mut StdRng, len: usize, sample_rate: u32) -> Vec<f32> {
    let mut value = 0.0f32;
    (0..len)
        .map(|i| {
            value = (value + white(rng) * 0.1) * 0.99;
            let mut out = value * 0.2;
            if rng.gen_bool(0.001) {
                let t = i as f32 / sample_rate as f32;
                out += (TAU * FOREST_CHIRP_HZ * t).sin() * 0.1;
            }
            out
        })
        .collect()
}

fn fire(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len)
        .map(|_| {
            let mut out = white(rng) * rng.gen_range(0.25..0.5);
            if rng.gen_bool(0.05) {
                out *= rng.gen_range(1.5..2.5);
            }
            out
        })
        .collect()
}

fn ocean(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let swell = (i as f32 / 1000.0).sin() * 0.3;
            (white(rng) * 0.2 + swell) * 0.4
        })
        .collect()
}

fn wind(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| white(rng) * 0.3).collect()
}
