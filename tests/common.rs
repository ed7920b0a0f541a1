#![allow(dead_code)]
use std::collections::HashSet;

use techno::presets::Primitive;
use techno::synth::SR;
use techno::time_forms::sine;
use techno::Buffer;

pub const TEST_SEED: u64 = 1234;

/// One second of a full-scale sine at `freq`.
pub fn tone(freq: f32) -> Buffer {
    Buffer::mono(sine(freq, 1.0, SR), SR).unwrap()
}

/// Equal-parts sum of sines, peak-normalized.
pub fn chord(freqs: &[f32]) -> Buffer {
    let mut samples = vec![0f32; SR as usize];
    for &f in freqs {
        for (out, x) in samples.iter_mut().zip(sine(f, 1.0, SR)) {
            *out += x;
        }
    }
    Buffer::mono(samples, SR).unwrap().normalize()
}

pub fn seeded(bpm: f64) -> Primitive {
    Primitive::new(bpm).unwrap().with_seed(Some(TEST_SEED))
}

pub fn distinct_values(buffer: &Buffer) -> usize {
    buffer.samples().iter().map(|x| x.to_bits()).collect::<HashSet<_>>().len()
}

pub fn frames_for_bars(ctx: &Primitive, bars: f64) -> usize {
    ctx.timing().bars_to_samples(bars, ctx.sample_rate())
}
