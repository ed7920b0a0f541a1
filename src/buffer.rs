//! PCM sample buffers with value semantics.
//!
//! A [`Buffer`] holds `f32` samples in nominal range [-1, 1] at a fixed sample
//! rate, interleaved when stereo. Every operation returns a new buffer; the
//! caller's buffer is never mutated. Values beyond full scale are kept as-is
//! until quantization to 16-bit, which clips.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::analysis::volume::db_to_amp;
use crate::error::{Error, Result};
use crate::synth::{SampleBuffer, I16_SCALE};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
  Mono,
  Stereo,
}

impl Channels {
  pub fn count(self) -> u16 {
    match self {
      Channels::Mono => 1,
      Channels::Stereo => 2,
    }
  }

  pub fn from_count(n: u16) -> Result<Self> {
    match n {
      1 => Ok(Channels::Mono),
      2 => Ok(Channels::Stereo),
      _ => Err(Error::invalid("channels", n, "1 or 2")),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
  samples: SampleBuffer,
  sample_rate: u32,
  channels: Channels,
}

/// Largest sample count a `Vec<f32>` can address.
const MAX_SAMPLES: usize = isize::MAX as usize / std::mem::size_of::<f32>();

/// Number of frames covering `ms` milliseconds at `sample_rate`.
/// Saturates for durations beyond any addressable buffer.
#[inline]
pub fn frames_for_ms(ms: f64, sample_rate: u32) -> usize {
  (ms.max(0.0) * sample_rate as f64 / 1000.0).round() as usize
}

/// Interleaved sample count covering `ms`, or `None` when `ms` is negative,
/// not finite, or too long to address.
fn samples_for_ms(ms: f64, sample_rate: u32, channels: Channels) -> Option<usize> {
  if !ms.is_finite() || ms < 0.0 {
    return None;
  }
  frames_for_ms(ms, sample_rate)
    .checked_mul(channels.count() as usize)
    .filter(|&n| n <= MAX_SAMPLES)
}

impl Buffer {
  pub fn new(samples: SampleBuffer, sample_rate: u32, channels: Channels) -> Result<Self> {
    if sample_rate == 0 {
      return Err(Error::invalid("sample_rate", sample_rate, "a sample rate > 0"));
    }
    if channels == Channels::Stereo && samples.len() % 2 != 0 {
      return Err(Error::invalid(
        "samples",
        samples.len(),
        "an even number of interleaved stereo samples",
      ));
    }
    Ok(Buffer {
      samples,
      sample_rate,
      channels,
    })
  }

  pub fn mono(samples: SampleBuffer, sample_rate: u32) -> Result<Self> {
    Buffer::new(samples, sample_rate, Channels::Mono)
  }

  /// Interleave two equally long channels into a stereo buffer.
  pub fn from_channels(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Self> {
    if left.len() != right.len() {
      return Err(Error::invalid(
        "right",
        right.len(),
        format!("a channel of {} samples to match the left channel", left.len()),
      ));
    }
    let samples = left.iter().interleave(right.iter()).copied().collect();
    Buffer::new(samples, sample_rate, Channels::Stereo)
  }

  /// All-zero buffer lasting `duration_ms`.
  pub fn silence(duration_ms: f64, sample_rate: u32, channels: Channels) -> Result<Self> {
    let n = samples_for_ms(duration_ms, sample_rate, channels)
      .ok_or_else(|| Error::invalid("duration_ms", duration_ms, "a finite duration >= 0 ms"))?;
    Buffer::new(vec![0f32; n], sample_rate, channels)
  }

  pub fn empty(sample_rate: u32, channels: Channels) -> Result<Self> {
    Buffer::new(Vec::new(), sample_rate, channels)
  }

  pub fn samples(&self) -> &[f32] {
    &self.samples
  }

  pub fn into_samples(self) -> SampleBuffer {
    self.samples
  }

  pub fn sample_rate(&self) -> u32 {
    self.sample_rate
  }

  pub fn channels(&self) -> Channels {
    self.channels
  }

  /// Samples per channel.
  pub fn frames(&self) -> usize {
    self.samples.len() / self.channels.count() as usize
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn duration_ms(&self) -> f64 {
    self.frames() as f64 * 1000.0 / self.sample_rate as f64
  }

  /// A buffer with the same format holding different samples.
  pub(crate) fn with_samples(&self, samples: SampleBuffer) -> Buffer {
    Buffer {
      samples,
      sample_rate: self.sample_rate,
      channels: self.channels,
    }
  }

  pub(crate) fn map(&self, f: impl Fn(f32) -> f32) -> Buffer {
    self.with_samples(self.samples.iter().map(|&x| f(x)).collect())
  }

  fn check_compatible(&self, other: &Buffer) -> Result<()> {
    if self.sample_rate != other.sample_rate || self.channels != other.channels {
      return Err(Error::ChannelOrRateMismatch {
        left_rate: self.sample_rate,
        left_channels: self.channels.count(),
        right_rate: other.sample_rate,
        right_channels: other.channels.count(),
      });
    }
    Ok(())
  }

  /// Sequential join of `self` then `other`.
  pub fn concat(&self, other: &Buffer) -> Result<Buffer> {
    self.check_compatible(other)?;
    let mut samples = Vec::with_capacity(self.len() + other.len());
    samples.extend_from_slice(&self.samples);
    samples.extend_from_slice(&other.samples);
    Ok(self.with_samples(samples))
  }

  /// Join many buffers of one format, in order.
  pub fn concat_all<'a>(parts: impl IntoIterator<Item = &'a Buffer>, sample_rate: u32, channels: Channels) -> Result<Buffer> {
    let mut out = Buffer::empty(sample_rate, channels)?;
    for part in parts {
      out.check_compatible(part)?;
      out.samples.extend_from_slice(&part.samples);
    }
    Ok(out)
  }

  /// Sample-wise addition of `layer` into a copy of `self`, starting `offset_ms` in.
  /// The result grows with silence when the layer runs past the end.
  pub fn overlay(&self, layer: &Buffer, offset_ms: f64) -> Result<Buffer> {
    self.check_compatible(layer)?;
    let (start, needed) = samples_for_ms(offset_ms, self.sample_rate, self.channels)
      .and_then(|start| Some((start, start.checked_add(layer.len())?)))
      .filter(|&(_, needed)| needed <= MAX_SAMPLES)
      .ok_or(Error::InvalidOffset { offset_ms })?;
    let mut samples = self.samples.clone();
    if needed > samples.len() {
      samples.resize(needed, 0f32);
    }
    for (out, &x) in samples[start..needed].iter_mut().zip(layer.samples.iter()) {
      *out += x;
    }
    Ok(self.with_samples(samples))
  }

  /// Scale by `10^(db/20)`. No clipping happens here.
  pub fn gain(&self, db: f32) -> Buffer {
    self.gain_linear(db_to_amp(db))
  }

  pub fn gain_linear(&self, k: f32) -> Buffer {
    self.map(|x| x * k)
  }

  /// Half-open `[start_ms, end_ms)` range, clamped to the buffer bounds.
  pub fn slice(&self, start_ms: f64, end_ms: f64) -> Result<Buffer> {
    if start_ms > end_ms || !start_ms.is_finite() || !end_ms.is_finite() {
      return Err(Error::InvalidRange { start_ms, end_ms });
    }
    let width = self.channels.count() as usize;
    let frames = self.frames();
    let a = frames_for_ms(start_ms, self.sample_rate).min(frames);
    let b = frames_for_ms(end_ms, self.sample_rate).min(frames).max(a);
    Ok(self.with_samples(self.samples[a * width..b * width].to_vec()))
  }

  /// Keep exactly `frames` frames, padding with silence when short.
  pub fn fit_frames(&self, frames: usize) -> Buffer {
    let mut samples = self.samples.clone();
    samples.resize(frames * self.channels.count() as usize, 0f32);
    self.with_samples(samples)
  }

  /// Loop the buffer until it lasts `duration_ms`, then cut it there.
  pub fn repeat_to(&self, duration_ms: f64) -> Result<Buffer> {
    let n = samples_for_ms(duration_ms, self.sample_rate, self.channels)
      .ok_or_else(|| Error::invalid("duration_ms", duration_ms, "a finite duration >= 0 ms"))?;
    if self.is_empty() {
      return Ok(self.with_samples(vec![0f32; n]));
    }
    let samples = self.samples.iter().copied().cycle().take(n).collect();
    Ok(self.with_samples(samples))
  }

  pub fn peak(&self) -> f32 {
    self.samples.iter().fold(0f32, |max, &x| max.max(x.abs()))
  }

  /// Peak-normalize to full scale. Silent buffers are returned unchanged.
  pub fn normalize(&self) -> Buffer {
    self.normalize_headroom(0f32)
  }

  /// Scale so the peak sits `headroom_db` below full scale.
  pub fn normalize_headroom(&self, headroom_db: f32) -> Buffer {
    let peak = self.peak();
    if peak == 0f32 {
      return self.clone();
    }
    self.gain_linear(db_to_amp(-headroom_db) / peak)
  }

  /// Linear ramp down to silence over the final `duration_ms`.
  pub fn fade_out(&self, duration_ms: f64) -> Buffer {
    let frames = self.frames();
    let fade = frames_for_ms(duration_ms, self.sample_rate).min(frames);
    if fade == 0 {
      return self.clone();
    }
    let width = self.channels.count() as usize;
    let start = frames - fade;
    let mut samples = self.samples.clone();
    for (frame, chunk) in samples.chunks_mut(width).enumerate().skip(start) {
      let k = 1f32 - (frame - start + 1) as f32 / fade as f32;
      chunk.iter_mut().for_each(|x| *x *= k);
    }
    self.with_samples(samples)
  }

  /// One channel as a contiguous signal.
  pub fn channel(&self, index: usize) -> SampleBuffer {
    let width = self.channels.count() as usize;
    self.samples.iter().skip(index.min(width - 1)).step_by(width).copied().collect()
  }

  /// Apply `f` to each channel independently and reassemble.
  pub(crate) fn map_channels(&self, f: impl Fn(&[f32]) -> Result<SampleBuffer>) -> Result<Buffer> {
    match self.channels {
      Channels::Mono => Ok(self.with_samples(f(&self.samples)?)),
      Channels::Stereo => {
        let left = f(&self.channel(0))?;
        let right = f(&self.channel(1))?;
        Buffer::from_channels(&left, &right, self.sample_rate)
      }
    }
  }

  /// Channel average.
  pub fn to_mono(&self) -> Buffer {
    match self.channels {
      Channels::Mono => self.clone(),
      Channels::Stereo => Buffer {
        samples: self.samples.chunks_exact(2).map(|lr| (lr[0] + lr[1]) / 2f32).collect(),
        sample_rate: self.sample_rate,
        channels: Channels::Mono,
      },
    }
  }

  /// Quantize to signed 16-bit: clip to [-32768, 32767], then truncate.
  pub fn to_i16(&self) -> Vec<i16> {
    self.samples
      .iter()
      .map(|&x| (x * I16_SCALE).clamp(-32768f32, 32767f32) as i16)
      .collect()
  }

  pub fn from_i16(samples: &[i16], sample_rate: u32, channels: Channels) -> Result<Buffer> {
    let samples = samples.iter().map(|&s| s as f32 / I16_SCALE).collect();
    Buffer::new(samples, sample_rate, channels)
  }

  /// The buffer as it will read back after 16-bit export.
  pub fn quantized(&self) -> Buffer {
    let samples = self.to_i16().into_iter().map(|s| s as f32 / I16_SCALE).collect();
    self.with_samples(samples)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::synth::SR;

  fn ramp(n: usize) -> Buffer {
    Buffer::mono((0..n).map(|i| i as f32 / n as f32).collect(), SR).unwrap()
  }

  #[test]
  fn test_silence_length_matches_duration() {
    let b = Buffer::silence(1000.0, SR, Channels::Mono).unwrap();
    assert_eq!(b.len(), 44100);
    let b = Buffer::silence(10.0, SR, Channels::Stereo).unwrap();
    assert_eq!(b.frames(), 441);
    assert_eq!(b.len(), 882);
    assert!(b.samples().iter().all(|&x| x == 0.0));
    assert!(Buffer::silence(-1.0, SR, Channels::Mono).is_err());
  }

  #[test]
  fn test_new_rejects_bad_format() {
    assert!(Buffer::new(vec![0.0; 3], SR, Channels::Stereo).is_err());
    assert!(Buffer::new(vec![0.0; 4], 0, Channels::Mono).is_err());
  }

  #[test]
  fn test_concat_lengths_add() {
    let a = ramp(100);
    let b = ramp(50);
    let c = a.concat(&b).unwrap();
    assert_eq!(c.len(), 150);
    assert_eq!(c.samples()[100], 0.0);
  }

  #[test]
  fn test_concat_rejects_mismatch() {
    let a = ramp(10);
    let b = Buffer::silence(1.0, 48000, Channels::Mono).unwrap();
    assert!(matches!(a.concat(&b), Err(Error::ChannelOrRateMismatch { .. })));
    let s = Buffer::silence(1.0, SR, Channels::Stereo).unwrap();
    assert!(matches!(a.concat(&s), Err(Error::ChannelOrRateMismatch { .. })));
  }

  #[test]
  fn test_overlay_adds_at_offset_and_extends() {
    let base = Buffer::mono(vec![1.0; 441], SR).unwrap();
    let layer = Buffer::mono(vec![0.5; 441], SR).unwrap();
    let out = base.overlay(&layer, 5.0).unwrap();
    // 5 ms at 44.1 kHz rounds to 221 frames
    assert_eq!(out.len(), 221 + 441);
    assert_eq!(out.samples()[0], 1.0);
    assert_eq!(out.samples()[220], 1.0);
    assert_eq!(out.samples()[221], 1.5);
    assert_eq!(out.samples()[out.len() - 1], 0.5);
    // the input is untouched
    assert!(base.samples().iter().all(|&x| x == 1.0));
  }

  #[test]
  fn test_overlay_negative_offset_fails() {
    let base = ramp(10);
    assert!(matches!(base.overlay(&base, -1.0), Err(Error::InvalidOffset { .. })));
  }

  #[test]
  fn test_unbounded_durations_are_rejected() {
    let b = ramp(10);
    for bad in [f64::INFINITY, f64::NAN, 1e300] {
      assert!(matches!(b.overlay(&b, bad), Err(Error::InvalidOffset { .. })), "offset {}", bad);
      assert!(matches!(b.repeat_to(bad), Err(Error::InvalidParameter { .. })), "repeat {}", bad);
      for channels in [Channels::Mono, Channels::Stereo] {
        assert!(matches!(Buffer::silence(bad, SR, channels), Err(Error::InvalidParameter { .. })));
      }
    }
    assert!(matches!(b.slice(0.0, f64::INFINITY), Err(Error::InvalidRange { .. })));
    // an endless fade covers the whole buffer
    let f = Buffer::mono(vec![1.0; 100], SR).unwrap().fade_out(f64::INFINITY);
    assert_eq!(f.len(), 100);
    assert_eq!(f.samples()[99], 0.0);
    assert!(f.samples()[0] < 1.0);
  }

  #[test]
  fn test_gain_db() {
    let b = Buffer::mono(vec![0.5, -0.5], SR).unwrap();
    let g = b.gain(6.0206);
    assert!((g.samples()[0] - 1.0).abs() < 1e-3);
    let g = b.gain(20.0);
    assert!((g.samples()[1] + 5.0).abs() < 1e-4, "gain does not clip");
  }

  #[test]
  fn test_slice_clamps_and_validates() {
    let b = ramp(44100);
    let s = b.slice(500.0, 2000.0).unwrap();
    assert_eq!(s.len(), 22050);
    let s = b.slice(0.0, 10.0).unwrap();
    assert_eq!(s.len(), 441);
    assert!(matches!(b.slice(20.0, 10.0), Err(Error::InvalidRange { .. })));
  }

  #[test]
  fn test_repeat_to() {
    let b = ramp(441);
    let r = b.repeat_to(25.0).unwrap();
    assert_eq!(r.len(), 1103);
    assert_eq!(r.samples()[441], b.samples()[0]);
  }

  #[test]
  fn test_normalize_and_headroom() {
    let b = Buffer::mono(vec![0.25, -0.5, 0.1], SR).unwrap();
    assert!((b.normalize().peak() - 1.0).abs() < 1e-6);
    let h = b.normalize_headroom(6.0206);
    assert!((h.peak() - 0.5).abs() < 1e-3);
    let z = Buffer::silence(10.0, SR, Channels::Mono).unwrap();
    assert_eq!(z.normalize(), z);
  }

  #[test]
  fn test_fade_out_reaches_zero() {
    let b = Buffer::mono(vec![1.0; 1000], SR).unwrap();
    let f = b.fade_out(b.duration_ms() / 2.0);
    assert_eq!(f.samples()[0], 1.0);
    assert_eq!(f.samples()[999], 0.0);
    assert!(f.samples()[750] < 1.0 && f.samples()[750] > 0.0);
  }

  #[test]
  fn test_stereo_channels_round_trip() {
    let l = vec![0.1, 0.2, 0.3];
    let r = vec![-0.1, -0.2, -0.3];
    let b = Buffer::from_channels(&l, &r, SR).unwrap();
    assert_eq!(b.samples(), &[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
    assert_eq!(b.channel(0), l);
    assert_eq!(b.channel(1), r);
    assert!(b.to_mono().samples().iter().all(|&x| x.abs() < 1e-7));
  }

  #[test]
  fn test_quantization_within_one_lsb() {
    let b = Buffer::mono((0..1000).map(|i| ((i as f32) * 0.01).sin() * 0.9).collect(), SR).unwrap();
    let q = b.quantized();
    for (x, y) in b.samples().iter().zip(q.samples()) {
      assert!((x - y).abs() <= 1.0 / I16_SCALE, "{} vs {}", x, y);
    }
  }

  #[test]
  fn test_quantization_clips() {
    let b = Buffer::mono(vec![2.0, -2.0, 1.0], SR).unwrap();
    assert_eq!(b.to_i16(), vec![32767, -32768, 32767]);
  }
}
