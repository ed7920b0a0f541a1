//! Techno kick from three layers: a pitched sub, a punchy body and a click.
use serde::{Deserialize, Serialize};

use super::Primitive;
use crate::buffer::{frames_for_ms, Buffer};
use crate::envelope::exp_decay;
use crate::error::{Error, Result};
use crate::fx::{waveshaper, Curve};
use crate::synth::{noise_sample, nyquist, pi2};

const SUB_DECAY: f32 = 8.0;
const PUNCH_DECAY: f32 = 15.0;
const CLICK_DECAY: f32 = 100.0;
/// Sub pitch starts this fraction above `sub_freq` and falls with the sub envelope.
const PITCH_DROP: f32 = 0.5;

const SUB_MIX: f32 = 0.7;
const PUNCH_MIX: f32 = 0.5;
const CLICK_MIX: f32 = 0.3;

const INDUSTRIAL_DRIVE: f32 = 0.7;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KickParams {
    /// Fundamental of the sub layer, 40-60 Hz.
    pub sub_freq: f32,
    /// Body frequency, 60-120 Hz.
    pub punch_freq: f32,
    /// Accepted for completeness. The layers start at full level.
    pub attack_ms: f32,
    /// Tail length, which is also the kick length.
    pub decay_ms: f32,
    /// Body amount in [0, 1].
    pub punch: f32,
}

impl Default for KickParams {
    fn default() -> Self {
        KickParams {
            sub_freq: 50.0,
            punch_freq: 80.0,
            attack_ms: 5.0,
            decay_ms: 200.0,
            punch: 0.8,
        }
    }
}

impl KickParams {
    /// Clean and tight.
    pub fn minimal() -> Self {
        KickParams {
            sub_freq: 55.0,
            punch_freq: 75.0,
            attack_ms: 3.0,
            decay_ms: 150.0,
            punch: 0.6,
        }
    }

    /// Long, low and fully punched. Distorted after rendering.
    pub fn industrial() -> Self {
        KickParams {
            sub_freq: 45.0,
            punch_freq: 90.0,
            attack_ms: 2.0,
            decay_ms: 250.0,
            punch: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KickStyle {
    Minimal,
    Industrial,
    Custom(KickParams),
}

impl Default for KickStyle {
    fn default() -> Self {
        KickStyle::Custom(KickParams::default())
    }
}

impl KickStyle {
    pub fn params(&self) -> KickParams {
        match self {
            KickStyle::Minimal => KickParams::minimal(),
            KickStyle::Industrial => KickParams::industrial(),
            KickStyle::Custom(p) => *p,
        }
    }
}

pub struct Kick {
    ctx: Primitive,
}

impl Kick {
    pub fn new(ctx: Primitive) -> Self {
        Kick { ctx }
    }

    fn validate(&self, p: &KickParams) -> Result<()> {
        let nyq = nyquist(self.ctx.sample_rate());
        for f in [p.sub_freq, p.punch_freq] {
            if !(f > 0.0 && f < nyq) {
                return Err(Error::FrequencyOutOfRange { frequency_hz: f, min_hz: 0.0, max_hz: nyq });
            }
        }
        if !(p.decay_ms > 0.0) {
            return Err(Error::invalid("decay_ms", p.decay_ms, "a tail > 0 ms"));
        }
        if !(p.attack_ms >= 0.0) {
            return Err(Error::invalid("attack_ms", p.attack_ms, "a time >= 0 ms"));
        }
        if !(0.0..=1.0).contains(&p.punch) {
            return Err(Error::invalid("punch", p.punch, "an amount in [0, 1]"));
        }
        Ok(())
    }

    /// Render one kick, peak-normalized, lasting `decay_ms`.
    pub fn generate(&self, p: &KickParams) -> Result<Buffer> {
        self.validate(p)?;
        let sr = self.ctx.sample_rate();
        let n = frames_for_ms(p.decay_ms as f64, sr);
        let mut rng = self.ctx.rng();

        let sub_env = exp_decay(n, SUB_DECAY, sr);
        let punch_env = exp_decay(n, PUNCH_DECAY, sr);
        let click_env = exp_decay(n, CLICK_DECAY, sr);

        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                let sub_pitch = p.sub_freq * (1.0 + sub_env[i] * PITCH_DROP);
                let sub = (pi2 * sub_pitch * t).sin() * sub_env[i];

                let punch_sine = (pi2 * p.punch_freq * t).sin() * punch_env[i];
                let punch_noise = noise_sample(&mut rng) * punch_env[i] * 0.3;
                let punch = (punch_sine + punch_noise) * p.punch;

                let click = noise_sample(&mut rng) * click_env[i] * 0.5;

                sub * SUB_MIX + punch * PUNCH_MIX + click * CLICK_MIX
            })
            .collect();

        Ok(Buffer::mono(samples, sr)?.normalize())
    }

    pub fn generate_minimal(&self) -> Result<Buffer> {
        self.generate(&KickParams::minimal())
    }

    /// The industrial kick through a soft waveshaper.
    pub fn generate_industrial(&self) -> Result<Buffer> {
        let kick = self.generate(&KickParams::industrial())?;
        waveshaper(&kick, INDUSTRIAL_DRIVE, Curve::Soft)
    }

    pub fn render(&self, style: KickStyle) -> Result<Buffer> {
        match style {
            KickStyle::Industrial => self.generate_industrial(),
            other => self.generate(&other.params()),
        }
    }
}
