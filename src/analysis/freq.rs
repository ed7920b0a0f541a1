use std::collections::HashMap;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::filter;
use crate::phrase::Element;

/// High-pass applied to the bass stem so the kick owns the sub band.
pub const BASS_CARVE_HZ: f32 = 80.0;

/// A named range of the spectrum and what usually lives there.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct FrequencyBand {
  pub low_hz: f32,
  pub high_hz: f32,
  pub name: &'static str,
  pub role: &'static str,
}

impl FrequencyBand {
  /// Inclusive on both edges.
  #[inline]
  pub fn contains(&self, freq: f32) -> bool {
    freq >= self.low_hz && freq <= self.high_hz
  }
}

pub const SUB: FrequencyBand = FrequencyBand { low_hz: 20.0, high_hz: 60.0, name: "sub", role: "kick_fundamental" };
pub const BASS: FrequencyBand = FrequencyBand { low_hz: 60.0, high_hz: 250.0, name: "bass", role: "kick_body_and_bass" };
pub const LOW_MIDS: FrequencyBand = FrequencyBand { low_hz: 250.0, high_hz: 500.0, name: "low_mids", role: "bass_harmonics" };
pub const MIDS: FrequencyBand = FrequencyBand { low_hz: 500.0, high_hz: 2000.0, name: "mids", role: "synth_pads" };
pub const HIGH_MIDS: FrequencyBand = FrequencyBand { low_hz: 2000.0, high_hz: 6000.0, name: "high_mids", role: "transients" };
pub const HIGHS: FrequencyBand = FrequencyBand { low_hz: 6000.0, high_hz: 12000.0, name: "highs", role: "hi_hats" };
pub const AIR: FrequencyBand = FrequencyBand { low_hz: 12000.0, high_hz: 20000.0, name: "air", role: "shimmer" };

/// The seven canonical bands, low to high.
pub const BANDS: [FrequencyBand; 7] = [SUB, BASS, LOW_MIDS, MIDS, HIGH_MIDS, HIGHS, AIR];

/// Where each element is expected to sit in a techno mix.
pub struct FrequencyMap;

impl FrequencyMap {
  pub fn allocation(element: Element) -> Vec<FrequencyBand> {
    match element {
      // sub, body and click
      Element::Kick => vec![SUB, BASS, HIGH_MIDS],
      Element::Bass => vec![BASS, LOW_MIDS],
      Element::Hats => vec![HIGHS, AIR],
    }
  }
}

/// Share of spectral energy per canonical band, in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyReport {
  bands: Vec<(FrequencyBand, f32)>,
}

impl FrequencyReport {
  pub fn percentage(&self, name: &str) -> Option<f32> {
    self.bands.iter().find(|(band, _)| band.name == name).map(|(_, pct)| *pct)
  }

  /// Near 100 for broadband material; above 100 when energy sits on a shared edge.
  pub fn total(&self) -> f32 {
    self.bands.iter().map(|(_, pct)| pct).sum()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&FrequencyBand, f32)> {
    self.bands.iter().map(|(band, pct)| (band, *pct))
  }
}

impl Serialize for FrequencyReport {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.bands.len()))?;
    for (band, pct) in &self.bands {
      map.serialize_entry(band.name, pct)?;
    }
    map.end()
  }
}

/// Energy of every non-negative frequency bin, paired with its frequency.
fn power_spectrum(signal: &[f32], sample_rate: u32) -> Vec<(f32, f32)> {
  let n = signal.len();
  if n == 0 {
    return Vec::new();
  }
  let mut spectrum: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
  let mut planner = FftPlanner::<f32>::new();
  let fft = planner.plan_fft_forward(n);
  fft.process(&mut spectrum);

  let bin_hz = sample_rate as f32 / n as f32;
  spectrum[..=n / 2]
    .iter()
    .enumerate()
    .map(|(k, c)| (k as f32 * bin_hz, c.norm_sqr()))
    .collect()
}

/// Measure how the buffer's energy spreads over the canonical bands.
///
/// Stereo input is averaged to mono first. A bin on a shared edge (60 Hz,
/// 250 Hz, ...) counts toward both bands. Silent or empty input reports 0 %
/// everywhere.
pub fn analyze(buffer: &Buffer) -> FrequencyReport {
  let mono = buffer.to_mono();
  let power = power_spectrum(mono.samples(), buffer.sample_rate());
  let total: f64 = power.iter().map(|&(_, e)| e as f64).sum();

  let bands = BANDS
    .iter()
    .map(|band| {
      let energy: f64 = power.iter().filter(|(f, _)| band.contains(*f)).map(|&(_, e)| e as f64).sum();
      let pct = if total > 0.0 { (energy / total * 100.0) as f32 } else { 0.0 };
      (*band, pct)
    })
    .collect();
  FrequencyReport { bands }
}

/// Keep stems out of each other's way. The bass stem is high-passed at
/// 80 Hz; other stems pass through unchanged.
pub fn carve_frequency_space(stems: &HashMap<Element, Buffer>) -> Result<HashMap<Element, Buffer>> {
  stems
    .iter()
    .map(|(&element, audio)| {
      let carved = match element {
        Element::Bass => filter::high_pass(audio, BASS_CARVE_HZ, filter::DEFAULT_ORDER)?,
        _ => audio.clone(),
      };
      Ok((element, carved))
    })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::buffer::Channels;
  use crate::synth::SR;
  use crate::time_forms::sine;

  fn tone(freq: f32) -> Buffer {
    Buffer::mono(sine(freq, 1.0, SR), SR).unwrap()
  }

  #[test]
  fn test_sub_tone() {
    let report = analyze(&tone(50.0));
    assert!(report.percentage("sub").unwrap() > 50.0);
    assert!(report.percentage("air").unwrap() < 5.0);
  }

  #[test]
  fn test_mid_tone() {
    let report = analyze(&tone(1000.0));
    assert!(report.percentage("mids").unwrap() > 50.0);
    assert!(report.percentage("sub").unwrap() < 5.0);
    assert!(report.percentage("air").unwrap() < 5.0);
    assert!((report.total() - 100.0).abs() < 1.0);
  }

  #[test]
  fn test_silence_reports_zero() {
    let report = analyze(&Buffer::silence(100.0, SR, Channels::Mono).unwrap());
    assert!(report.iter().all(|(_, pct)| pct == 0.0));
    let report = analyze(&Buffer::empty(SR, Channels::Stereo).unwrap());
    assert_eq!(report.total(), 0.0);
  }

  #[test]
  fn test_shared_edge_counts_twice() {
    // 1 s at 44.1 kHz puts a bin exactly on 250 Hz
    let report = analyze(&tone(250.0));
    assert!(report.percentage("bass").unwrap() > 90.0);
    assert!(report.percentage("low_mids").unwrap() > 90.0);
    assert!(report.total() > 180.0);
  }

  #[test]
  fn test_report_keeps_band_order_and_serializes() {
    let report = analyze(&tone(8000.0));
    let names: Vec<&str> = report.iter().map(|(b, _)| b.name).collect();
    assert_eq!(names, vec!["sub", "bass", "low_mids", "mids", "high_mids", "highs", "air"]);
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["highs"].as_f64().unwrap() > 50.0);
    assert_eq!(json.as_object().unwrap().len(), 7);
  }

  #[test]
  fn test_allocation() {
    assert_eq!(FrequencyMap::allocation(Element::Hats), vec![HIGHS, AIR]);
    assert!(FrequencyMap::allocation(Element::Kick).contains(&SUB));
  }

  #[test]
  fn test_carve_only_touches_bass() {
    let mut stems = HashMap::new();
    stems.insert(Element::Bass, tone(40.0));
    stems.insert(Element::Kick, tone(40.0));
    let carved = carve_frequency_space(&stems).unwrap();
    assert_eq!(carved[&Element::Kick], stems[&Element::Kick]);
    assert!(carved[&Element::Bass].slice(200.0, 800.0).unwrap().peak() < 0.2);
  }
}
