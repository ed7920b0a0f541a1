//! Digital filter design and zero-phase application.
//!
//! Butterworth low/high/band-pass filters of any order up to [`MAX_ORDER`] are
//! realized as cascades of `biquad` second-order sections, plus a bilinear
//! first-order section for odd orders. Filtering runs forward then backward
//! over an odd-extended copy of the signal, so transients keep their timing.
//!
//! Designs are pure functions of their [`FilterSpec`] and are memoized.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::RwLock;

use biquad::{Biquad, Coefficients, DirectForm1, Hertz, Type as FilterType};
use once_cell::sync::Lazy;
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::synth::{nyquist, SampleBuffer};

pub const DEFAULT_ORDER: usize = 4;
pub const DEFAULT_RESONANCE: f32 = 0.7;
pub const MAX_ORDER: usize = 16;

/// Chunk length used by [`filter_sweep`].
pub const SWEEP_CHUNK_MS: f64 = 500.0;

/// Peak Q per unit of resonance.
const RESONANCE_Q: f32 = 10.0;
/// Peak boost in dB per unit of resonance.
const RESONANCE_GAIN_DB: f32 = 6.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    Peak,
}

/// Everything needed to design a filter.
///
/// `low_hz` is the cutoff for low/high-pass, the lower edge for band-pass and
/// the center for peak filters. `high_hz` is only read by band-pass, `q` and
/// `gain_db` only by peak filters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub low_hz: f32,
    pub high_hz: f32,
    pub order: usize,
    pub q: f32,
    pub gain_db: f32,
    pub sample_rate: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FilterKey(FilterKind, u32, u32, usize, u32, u32, u32);

impl From<&FilterSpec> for FilterKey {
    fn from(s: &FilterSpec) -> Self {
        FilterKey(
            s.kind,
            s.low_hz.to_bits(),
            s.high_hz.to_bits(),
            s.order,
            s.q.to_bits(),
            s.gain_db.to_bits(),
            s.sample_rate,
        )
    }
}

static DESIGN_CACHE: Lazy<RwLock<HashMap<FilterKey, Cascade>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Fail unless `0 < cutoff_hz < sample_rate / 2`.
pub fn validate_cutoff(cutoff_hz: f32, sample_rate: u32) -> Result<()> {
    let nyquist_hz = nyquist(sample_rate);
    if cutoff_hz > 0.0 && cutoff_hz < nyquist_hz {
        Ok(())
    } else {
        Err(Error::InvalidCutoff { cutoff_hz, nyquist_hz })
    }
}

impl FilterSpec {
    pub fn low_pass(cutoff_hz: f32, order: usize, sample_rate: u32) -> Self {
        FilterSpec {
            kind: FilterKind::LowPass,
            low_hz: cutoff_hz,
            high_hz: 0.0,
            order,
            q: 0.0,
            gain_db: 0.0,
            sample_rate,
        }
    }

    pub fn high_pass(cutoff_hz: f32, order: usize, sample_rate: u32) -> Self {
        FilterSpec {
            kind: FilterKind::HighPass,
            ..FilterSpec::low_pass(cutoff_hz, order, sample_rate)
        }
    }

    pub fn band_pass(low_hz: f32, high_hz: f32, order: usize, sample_rate: u32) -> Self {
        FilterSpec {
            kind: FilterKind::BandPass,
            high_hz,
            ..FilterSpec::low_pass(low_hz, order, sample_rate)
        }
    }

    pub fn peak(center_hz: f32, q: f32, gain_db: f32, sample_rate: u32) -> Self {
        FilterSpec {
            kind: FilterKind::Peak,
            low_hz: center_hz,
            high_hz: 0.0,
            order: 2,
            q,
            gain_db,
            sample_rate,
        }
    }

    /// Memoized [`FilterSpec::design_uncached`].
    pub fn design(&self) -> Result<Cascade> {
        let key = FilterKey::from(self);
        if let Ok(cache) = DESIGN_CACHE.read() {
            if let Some(cascade) = cache.get(&key) {
                return Ok(cascade.clone());
            }
        }
        let cascade = self.design_uncached()?;
        debug!(kind = ?self.kind, low_hz = self.low_hz, high_hz = self.high_hz, order = self.order, "designed filter");
        if let Ok(mut cache) = DESIGN_CACHE.write() {
            cache.insert(key, cascade.clone());
        }
        Ok(cascade)
    }

    pub fn design_uncached(&self) -> Result<Cascade> {
        let sr = self.sample_rate;
        if sr == 0 {
            return Err(Error::invalid("sample_rate", sr, "a sample rate > 0"));
        }
        validate_cutoff(self.low_hz, sr)?;
        if self.kind != FilterKind::Peak && (self.order == 0 || self.order > MAX_ORDER) {
            return Err(Error::FilterDesignFailure(format!(
                "order {} outside 1..={}",
                self.order, MAX_ORDER
            )));
        }

        let sections = match self.kind {
            FilterKind::LowPass => butterworth(FilterKind::LowPass, self.low_hz, self.order, sr)?,
            FilterKind::HighPass => butterworth(FilterKind::HighPass, self.low_hz, self.order, sr)?,
            FilterKind::BandPass => {
                validate_cutoff(self.high_hz, sr)?;
                if self.low_hz >= self.high_hz {
                    return Err(Error::FilterDesignFailure(format!(
                        "band-pass low edge {} Hz must be below high edge {} Hz",
                        self.low_hz, self.high_hz
                    )));
                }
                let mut sections = butterworth(FilterKind::HighPass, self.low_hz, self.order, sr)?;
                sections.extend(butterworth(FilterKind::LowPass, self.high_hz, self.order, sr)?);
                sections
            }
            FilterKind::Peak => {
                if !(self.q > 0.0) || !self.gain_db.is_finite() {
                    return Err(Error::FilterDesignFailure(format!(
                        "peak filter needs q > 0 and a finite gain, got q = {}, gain = {} dB",
                        self.q, self.gain_db
                    )));
                }
                vec![rbj(FilterType::PeakingEQ(self.gain_db as f64), self.low_hz, self.q as f64, sr)?]
            }
        };
        Ok(Cascade::new(sections))
    }
}

fn hertz(f: f64) -> Result<Hertz<f64>> {
    Hertz::<f64>::from_hz(f).map_err(|e| Error::FilterDesignFailure(format!("{:?}", e)))
}

/// One cookbook second-order section.
fn rbj(filter: FilterType<f64>, f0: f32, q: f64, sample_rate: u32) -> Result<Coefficients<f64>> {
    Coefficients::<f64>::from_params(filter, hertz(sample_rate as f64)?, hertz(f0 as f64)?, q)
        .map_err(|e| Error::FilterDesignFailure(format!("Failed to create filter coefficients: {:?}", e)))
}

/// Bilinear first-order section, prewarped at the cutoff.
fn first_order(kind: FilterKind, cutoff_hz: f32, sample_rate: u32) -> Coefficients<f64> {
    let k = (PI * cutoff_hz as f64 / sample_rate as f64).tan();
    let a1 = (k - 1.0) / (k + 1.0);
    let (b0, b1) = match kind {
        FilterKind::HighPass => (1.0 / (k + 1.0), -1.0 / (k + 1.0)),
        _ => (k / (k + 1.0), k / (k + 1.0)),
    };
    Coefficients { a1, a2: 0.0, b0, b1, b2: 0.0 }
}

/// Second-order sections of an order-`order` Butterworth low or high-pass.
///
/// Pole pair `k` sits at angle `(order - 1 - 2k) * pi / (2 * order)` from the
/// negative real axis, giving the section Q `1 / (2 cos(angle))`.
fn butterworth(kind: FilterKind, cutoff_hz: f32, order: usize, sample_rate: u32) -> Result<Vec<Coefficients<f64>>> {
    let filter = match kind {
        FilterKind::HighPass => FilterType::HighPass,
        _ => FilterType::LowPass,
    };
    let n = order as f64;
    let mut sections = Vec::with_capacity(order / 2 + 1);
    for k in 0..order / 2 {
        let angle = (n - 1.0 - 2.0 * k as f64) * PI / (2.0 * n);
        let q = 1.0 / (2.0 * angle.cos());
        sections.push(rbj(filter, cutoff_hz, q, sample_rate)?);
    }
    if order % 2 == 1 {
        sections.push(first_order(kind, cutoff_hz, sample_rate));
    }
    Ok(sections)
}

/// A designed filter: cascaded sections with no runtime state.
#[derive(Clone, Debug)]
pub struct Cascade {
    sections: Vec<Coefficients<f64>>,
}

impl Cascade {
    fn new(sections: Vec<Coefficients<f64>>) -> Self {
        Cascade { sections }
    }

    pub fn n_sections(&self) -> usize {
        self.sections.len()
    }

    /// Samples of odd extension added to each side before filtering.
    fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Causal, single direction pass from rest.
    fn run(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = signal.to_vec();
        for coeffs in &self.sections {
            let mut filter = DirectForm1::<f64>::new(*coeffs);
            out.iter_mut().for_each(|x| *x = filter.run(*x));
        }
        out
    }

    /// Causal filtering, with the phase shift that implies.
    pub fn lfilter(&self, signal: &[f32]) -> SampleBuffer {
        let x: Vec<f64> = signal.iter().map(|&s| s as f64).collect();
        self.run(&x).into_iter().map(|y| y as f32).collect()
    }

    /// Forward-backward filtering. Output is aligned with the input and has
    /// the squared magnitude response of a single pass.
    pub fn filtfilt(&self, signal: &[f32]) -> SampleBuffer {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = self.pad_len().min(n - 1);
        let first = signal[0] as f64;
        let last = signal[n - 1] as f64;

        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i] as f64));
        ext.extend(signal.iter().map(|&s| s as f64));
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i] as f64));

        let mut y = self.run(&ext);
        y.reverse();
        let mut y = self.run(&y);
        y.reverse();
        y[pad..pad + n].iter().map(|&v| v as f32).collect()
    }

    /// Single pass magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f32, sample_rate: u32) -> f64 {
        let w = 2.0 * PI * freq_hz as f64 / sample_rate as f64;
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        self.sections
            .iter()
            .map(|c| {
                let num = Complex::new(c.b0, 0.0) + z1 * c.b1 + z2 * c.b2;
                let den = Complex::new(1.0, 0.0) + z1 * c.a1 + z2 * c.a2;
                (num / den).norm()
            })
            .product()
    }
}

/// Zero-phase application of `spec` to every channel of `buffer`.
pub fn apply(buffer: &Buffer, spec: &FilterSpec) -> Result<Buffer> {
    if spec.sample_rate != buffer.sample_rate() {
        return Err(Error::invalid(
            "sample_rate",
            spec.sample_rate,
            format!("the buffer's sample rate ({} Hz)", buffer.sample_rate()),
        ));
    }
    let cascade = spec.design()?;
    buffer.map_channels(|ch| Ok(cascade.filtfilt(ch)))
}

/// Butterworth low-pass. A positive `resonance` adds a narrow peak at the
/// cutoff (Q `10 * resonance`, `+6 dB * resonance`) to mimic an analog filter.
pub fn low_pass(buffer: &Buffer, cutoff_hz: f32, resonance: f32, order: usize) -> Result<Buffer> {
    if !(resonance >= 0.0) || !resonance.is_finite() {
        return Err(Error::invalid("resonance", resonance, "a resonance >= 0"));
    }
    let sr = buffer.sample_rate();
    let filtered = apply(buffer, &FilterSpec::low_pass(cutoff_hz, order, sr))?;
    if resonance > 0.0 {
        peak(&filtered, cutoff_hz, resonance * RESONANCE_Q, resonance * RESONANCE_GAIN_DB)
    } else {
        Ok(filtered)
    }
}

pub fn high_pass(buffer: &Buffer, cutoff_hz: f32, order: usize) -> Result<Buffer> {
    apply(buffer, &FilterSpec::high_pass(cutoff_hz, order, buffer.sample_rate()))
}

/// Fourth-order Butterworth band between `low_hz` and `high_hz`.
pub fn band_pass(buffer: &Buffer, low_hz: f32, high_hz: f32) -> Result<Buffer> {
    band_pass_order(buffer, low_hz, high_hz, DEFAULT_ORDER)
}

pub fn band_pass_order(buffer: &Buffer, low_hz: f32, high_hz: f32, order: usize) -> Result<Buffer> {
    apply(buffer, &FilterSpec::band_pass(low_hz, high_hz, order, buffer.sample_rate()))
}

/// Peaking boost or cut centered on `center_hz`.
pub fn peak(buffer: &Buffer, center_hz: f32, q: f32, gain_db: f32) -> Result<Buffer> {
    apply(buffer, &FilterSpec::peak(center_hz, q, gain_db, buffer.sample_rate()))
}

/// Stepped low-pass sweep.
///
/// The sweep window (the whole buffer when `sweep_duration_ms` is `None`) is cut
/// into 500 ms chunks. Chunk `i` of `n` is low-passed at
/// `start_hz + (end_hz - start_hz) * i / n`; everything after the last whole
/// chunk is low-passed at `end_hz`. Each chunk is filtered on its own, so the
/// cutoff moves in audible steps.
pub fn filter_sweep(buffer: &Buffer, start_hz: f32, end_hz: f32, sweep_duration_ms: Option<f64>) -> Result<Buffer> {
    let sr = buffer.sample_rate();
    validate_cutoff(start_hz, sr)?;
    validate_cutoff(end_hz, sr)?;
    let window = sweep_duration_ms.unwrap_or_else(|| buffer.duration_ms());
    if !window.is_finite() || window < 0.0 {
        return Err(Error::invalid("sweep_duration_ms", window, "a finite duration >= 0 ms"));
    }

    // chunks past the end of the buffer are skipped; the slope still spans the whole window
    let n_chunks = (window / SWEEP_CHUNK_MS).floor() as usize;
    let covered_ms = (n_chunks as f64 * SWEEP_CHUNK_MS).min(buffer.duration_ms());
    let mut parts = Vec::with_capacity((covered_ms / SWEEP_CHUNK_MS).ceil() as usize + 1);
    for i in 0..n_chunks {
        let progress = i as f32 / n_chunks as f32;
        let cutoff = start_hz + (end_hz - start_hz) * progress;
        let start = i as f64 * SWEEP_CHUNK_MS;
        let chunk = buffer.slice(start, start + SWEEP_CHUNK_MS)?;
        if chunk.is_empty() {
            break;
        }
        parts.push(low_pass(&chunk, cutoff, DEFAULT_RESONANCE, DEFAULT_ORDER)?);
    }

    let remainder = buffer.slice(covered_ms, buffer.duration_ms())?;
    if !remainder.is_empty() {
        parts.push(low_pass(&remainder, end_hz, DEFAULT_RESONANCE, DEFAULT_ORDER)?);
    }

    Buffer::concat_all(parts.iter(), sr, buffer.channels())
}
