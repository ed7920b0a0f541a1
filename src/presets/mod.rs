//! Synthesis primitives: one function per drum or bass voice.
//!
//! Every voice renders from a [`Primitive`], the tempo and format context
//! shared by a track. Noise is drawn from a seeded generator when the
//! context carries a seed, so renders can be reproduced exactly.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::synth::SR;
use crate::time::TimingCalculator;

pub mod bass;
pub mod hats;
pub mod kick;

pub use bass::{Bass, BassNote};
pub use hats::HiHat;
pub use kick::{Kick, KickParams, KickStyle};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    timing: TimingCalculator,
    sample_rate: u32,
    seed: Option<u64>,
}

impl Primitive {
    /// Mono voices at 44.1 kHz with unseeded noise.
    pub fn new(bpm: f64) -> Result<Self> {
        Ok(Primitive {
            timing: TimingCalculator::new(bpm)?,
            sample_rate: SR,
            seed: None,
        })
    }

    pub fn with_sample_rate(self, sample_rate: u32) -> Self {
        Primitive { sample_rate, ..self }
    }

    pub fn with_seed(self, seed: Option<u64>) -> Self {
        Primitive { seed, ..self }
    }

    pub fn bpm(&self) -> f64 {
        self.timing.bpm()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn timing(&self) -> &TimingCalculator {
        &self.timing
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.timing.samples_per_beat(self.sample_rate)
    }

    /// Noise source for one render.
    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context() {
        let ctx = Primitive::new(120.0).unwrap();
        assert_eq!(ctx.sample_rate(), 44100);
        assert_eq!(ctx.samples_per_beat(), 22050.0);
        assert!(Primitive::new(0.0).is_err());
        let ctx = ctx.with_sample_rate(48000).with_seed(Some(7));
        assert_eq!(ctx.samples_per_beat(), 24000.0);
        assert_eq!(ctx.seed(), Some(7));
    }
}
