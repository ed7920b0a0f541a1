//! Methods for creating amplitude envelopes.
//! Intended to be multiplied sample-wise onto a signal of the same length.

use crate::error::{Error, Result};
use crate::synth::{n_samples, SampleBuffer};

#[derive(Copy, Clone, Debug)]
pub struct Envelope {
    n: usize,
    sample_rate: u32,
}

/// `n` evenly spaced values from `a` to `b`, both included.
fn linspace(a: f32, b: f32, n: usize) -> impl Iterator<Item = f32> {
    let step = if n > 1 { (b - a) / (n - 1) as f32 } else { 0.0 };
    (0..n).map(move |i| if n > 1 && i == n - 1 { b } else { a + step * i as f32 })
}

fn non_negative(name: &'static str, seconds: f32) -> Result<f32> {
    if seconds >= 0.0 && seconds.is_finite() {
        Ok(seconds)
    } else {
        Err(Error::invalid(name, seconds, "a duration >= 0 s"))
    }
}

impl Envelope {
    pub fn new(duration: f32, sample_rate: u32) -> Result<Envelope> {
        non_negative("duration", duration)?;
        Ok(Envelope::of_len(n_samples(duration, sample_rate), sample_rate))
    }

    /// An envelope sized to an existing signal.
    pub fn of_len(n: usize, sample_rate: u32) -> Envelope {
        Envelope { n, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Attack-decay-sustain-release contour in [0, 1].
    ///
    /// Phase lengths come from their own time parameters. When they do not fit,
    /// attack then decay win and release is squeezed into whatever remains.
    pub fn adsr(&self, attack: f32, decay: f32, sustain_level: f32, release: f32) -> Result<SampleBuffer> {
        let sr = self.sample_rate;
        let a = n_samples(non_negative("attack", attack)?, sr);
        let d = n_samples(non_negative("decay", decay)?, sr);
        let r = n_samples(non_negative("release", release)?, sr);
        if !(0.0..=1.0).contains(&sustain_level) {
            return Err(Error::invalid("sustain_level", sustain_level, "a level in [0, 1]"));
        }

        let total = self.n;
        let a_end = a.min(total);
        let d_end = (a + d).min(total);
        let r_start = total.saturating_sub(r).max(d_end);

        let mut env: SampleBuffer = Vec::with_capacity(total);
        env.extend(linspace(0.0, 1.0, a).take(a_end));
        env.extend(linspace(1.0, sustain_level, d).take(d_end - a_end));
        env.extend(std::iter::repeat(sustain_level).take(r_start - d_end));

        let level = env.last().copied().unwrap_or(sustain_level);
        env.extend(linspace(level, 0.0, total - r_start));
        Ok(env)
    }

    /// `exp(-rate * t)`: starts at 1 and falls for any positive rate.
    pub fn exponential_decay(&self, rate: f32) -> Result<SampleBuffer> {
        if !(rate >= 0.0) || !rate.is_finite() {
            return Err(Error::invalid("decay_rate", rate, "a rate >= 0"));
        }
        Ok(exp_decay(self.n, rate, self.sample_rate))
    }
}

/// Shared by the primitives, which size their envelopes from sample counts.
pub(crate) fn exp_decay(n: usize, rate: f32, sample_rate: u32) -> SampleBuffer {
    let sr = sample_rate as f32;
    (0..n).map(|i| (-rate * i as f32 / sr).exp()).collect()
}

pub fn adsr(attack: f32, decay: f32, sustain_level: f32, release: f32, duration: f32, sample_rate: u32) -> Result<SampleBuffer> {
    Envelope::new(duration, sample_rate)?.adsr(attack, decay, sustain_level, release)
}

pub fn exponential_decay(duration: f32, decay_rate: f32, sample_rate: u32) -> Result<SampleBuffer> {
    Envelope::new(duration, sample_rate)?.exponential_decay(decay_rate)
}

/// Multiply an envelope onto a signal, truncating to the shorter of the two.
pub fn apply(signal: &[f32], env: &[f32]) -> SampleBuffer {
    signal.iter().zip(env.iter()).map(|(x, g)| x * g).collect()
}
