//! A synth hihat from filtered white noise.
use super::Primitive;
use crate::buffer::{frames_for_ms, Buffer};
use crate::envelope::exp_decay;
use crate::error::{Error, Result};
use crate::filter::{band_pass_order, high_pass, DEFAULT_ORDER};
use crate::synth::noise_sample;

pub const DEFAULT_DURATION_MS: f64 = 50.0;
pub const DEFAULT_CLOSEDNESS: f32 = 0.8;

const HIGH_PASS_HZ: f32 = 4000.0;
const BAND_LOW_HZ: f32 = 6000.0;
const BAND_HIGH_HZ: f32 = 12000.0;
const BAND_ORDER: usize = 2;

const OPEN_DECAY: f32 = 10.0;
const CLOSED_DECAY: f32 = 50.0;

pub struct HiHat {
    ctx: Primitive,
}

/// Envelope rate for a hat: 10 when fully open, 50 when fully closed.
pub fn decay_rate(closedness: f32) -> f32 {
    CLOSED_DECAY * closedness + OPEN_DECAY * (1.0 - closedness)
}

impl HiHat {
    pub fn new(ctx: Primitive) -> Self {
        HiHat { ctx }
    }

    pub fn generate(&self, duration_ms: f64, closedness: f32) -> Result<Buffer> {
        if !(0.0..=1.0).contains(&closedness) {
            return Err(Error::invalid("closedness", closedness, "a value in [0, 1] (0 open, 1 closed)"));
        }
        if !(duration_ms >= 0.0) {
            return Err(Error::invalid("duration_ms", duration_ms, "a duration >= 0 ms"));
        }
        let sr = self.ctx.sample_rate();
        let n = frames_for_ms(duration_ms, sr);
        let mut rng = self.ctx.rng();
        let noise = Buffer::mono((0..n).map(|_| noise_sample(&mut rng)).collect(), sr)?;

        let shaped = high_pass(&noise, HIGH_PASS_HZ, DEFAULT_ORDER)?;
        let shaped = band_pass_order(&shaped, BAND_LOW_HZ, BAND_HIGH_HZ, BAND_ORDER)?;

        let env = exp_decay(n, decay_rate(closedness), sr);
        let hat = shaped.samples().iter().zip(env).map(|(x, g)| x * g).collect();
        Ok(Buffer::mono(hat, sr)?.normalize())
    }

    pub fn generate_default(&self) -> Result<Buffer> {
        self.generate(DEFAULT_DURATION_MS, DEFAULT_CLOSEDNESS)
    }
}
