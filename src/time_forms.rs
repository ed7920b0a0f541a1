//! Generation of conventional waveforms using time-domain
//!
//! Each generator yields exactly `round(sample_rate * duration)` samples in
//! [-1, 1], sampled at `t = i / sample_rate`. Frequencies at or above Nyquist
//! are not rejected here; callers that care enforce their own range.

use serde::{Deserialize, Serialize};

use crate::synth::{n_samples, pi2, SampleBuffer};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

/// Position within the current period, in [0, 1).
#[inline]
fn cycle_pos(i: usize, freq: f32, sample_rate: u32) -> f32 {
    let cycles = i as f64 * freq as f64 / sample_rate as f64;
    cycles.rem_euclid(1.0) as f32
}

#[inline]
pub fn sine_sample(i: usize, freq: f32, sample_rate: u32) -> f32 {
    (pi2 * cycle_pos(i, freq, sample_rate)).sin()
}

/// Linear ramp from -1 to 1 over each period.
#[inline]
pub fn sawtooth_sample(i: usize, freq: f32, sample_rate: u32) -> f32 {
    2.0 * cycle_pos(i, freq, sample_rate) - 1.0
}

#[inline]
pub fn square_sample(i: usize, freq: f32, sample_rate: u32) -> f32 {
    if cycle_pos(i, freq, sample_rate) < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Symmetric ramp: -1 at the start of the period, 1 at the midpoint.
#[inline]
pub fn triangle_sample(i: usize, freq: f32, sample_rate: u32) -> f32 {
    1.0 - 4.0 * (cycle_pos(i, freq, sample_rate) - 0.5).abs()
}

fn render(ugen: fn(usize, f32, u32) -> f32, freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
    (0..n_samples(duration, sample_rate)).map(|i| ugen(i, freq, sample_rate)).collect()
}

pub fn sine(freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
    render(sine_sample, freq, duration, sample_rate)
}

pub fn sawtooth(freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
    render(sawtooth_sample, freq, duration, sample_rate)
}

pub fn square(freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
    render(square_sample, freq, duration, sample_rate)
}

pub fn triangle(freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
    render(triangle_sample, freq, duration, sample_rate)
}

impl Waveform {
    pub fn render(self, freq: f32, duration: f32, sample_rate: u32) -> SampleBuffer {
        match self {
            Waveform::Sine => sine(freq, duration, sample_rate),
            Waveform::Saw => sawtooth(freq, duration, sample_rate),
            Waveform::Square => square(freq, duration, sample_rate),
            Waveform::Triangle => triangle(freq, duration, sample_rate),
        }
    }

    /// Render exactly `n` samples.
    pub fn render_n(self, freq: f32, n: usize, sample_rate: u32) -> SampleBuffer {
        let ugen: fn(usize, f32, u32) -> f32 = match self {
            Waveform::Sine => sine_sample,
            Waveform::Saw => sawtooth_sample,
            Waveform::Square => square_sample,
            Waveform::Triangle => triangle_sample,
        };
        (0..n).map(|i| ugen(i, freq, sample_rate)).collect()
    }
}
