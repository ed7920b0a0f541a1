use serde::{Deserialize, Serialize};

use super::Primitive;
use crate::buffer::Buffer;
use crate::envelope::exp_decay;
use crate::error::{Error, Result};
use crate::filter::{low_pass, DEFAULT_ORDER};
use crate::synth::midi_to_freq;
use crate::time_forms::Waveform;

pub const MIN_BASS_HZ: f32 = 20.0;
pub const MAX_BASS_HZ: f32 = 2000.0;

/// Amplitude decay rate of a bass note, per second.
const NOTE_DECAY: f32 = 0.5;

/// One pattern step lasts a quarter bar.
const STEP_BARS: f64 = 0.25;
const ACCENT_CUTOFF_HZ: f32 = 800.0;
const PLAIN_CUTOFF_HZ: f32 = 560.0;
const ACCENT_GAIN_DB: f32 = 3.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BassNote {
    pub frequency: f32,
    pub duration_bars: f64,
    pub waveform: Waveform,
    pub filter_cutoff: f32,
}

impl Default for BassNote {
    /// A quarter bar of filtered saw on A2.
    fn default() -> Self {
        BassNote {
            frequency: 110.0,
            duration_bars: 0.25,
            waveform: Waveform::Saw,
            filter_cutoff: 800.0,
        }
    }
}

/// A step of a 303 pattern.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Note,
    Accent,
    Rest,
}

impl Step {
    pub fn parse(c: char) -> Result<Step> {
        match c {
            'x' => Ok(Step::Note),
            '.' => Ok(Step::Accent),
            '-' => Ok(Step::Rest),
            other => Err(Error::invalid("pattern", other, "one of 'x', '.', '-'")),
        }
    }
}

pub struct Bass {
    ctx: Primitive,
}

impl Bass {
    pub fn new(ctx: Primitive) -> Self {
        Bass { ctx }
    }

    fn note_frames(&self, duration_bars: f64) -> usize {
        (duration_bars * 4.0 * self.ctx.samples_per_beat()).round() as usize
    }

    /// Render one enveloped and low-passed note, peak-normalized.
    pub fn generate_note(&self, note: &BassNote) -> Result<Buffer> {
        if !(note.frequency >= MIN_BASS_HZ && note.frequency <= MAX_BASS_HZ) {
            return Err(Error::FrequencyOutOfRange {
                frequency_hz: note.frequency,
                min_hz: MIN_BASS_HZ,
                max_hz: MAX_BASS_HZ,
            });
        }
        if !(note.duration_bars >= 0.0) {
            return Err(Error::invalid("duration_bars", note.duration_bars, "a length >= 0 bars"));
        }
        let sr = self.ctx.sample_rate();
        let n = self.note_frames(note.duration_bars);

        let env = exp_decay(n, NOTE_DECAY, sr);
        let samples = note
            .waveform
            .render_n(note.frequency, n, sr)
            .into_iter()
            .zip(env)
            .map(|(x, g)| x * g)
            .collect();

        let raw = Buffer::mono(samples, sr)?;
        Ok(low_pass(&raw, note.filter_cutoff, 0.0, DEFAULT_ORDER)?.normalize())
    }

    /// Acid line from a step string.
    ///
    /// `x` plays a note, `.` an accented note (brighter filter, +3 dB) and `-`
    /// rests. Every step is a quarter bar. Step `i` plays MIDI note
    /// `notes[i % notes.len()]`, counting rests.
    pub fn generate_303_pattern(&self, notes: &[u8], pattern: &str) -> Result<Buffer> {
        if notes.is_empty() {
            return Err(Error::invalid("notes", "[]", "at least one MIDI note"));
        }
        let steps = pattern.chars().map(Step::parse).collect::<Result<Vec<_>>>()?;
        let sr = self.ctx.sample_rate();
        let rest = Buffer::mono(vec![0f32; self.note_frames(STEP_BARS)], sr)?;

        let parts = steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let frequency = midi_to_freq(notes[i % notes.len()]);
                let note = |filter_cutoff| BassNote {
                    frequency,
                    duration_bars: STEP_BARS,
                    waveform: Waveform::Saw,
                    filter_cutoff,
                };
                match step {
                    Step::Note => self.generate_note(&note(PLAIN_CUTOFF_HZ)),
                    Step::Accent => Ok(self.generate_note(&note(ACCENT_CUTOFF_HZ))?.gain(ACCENT_GAIN_DB)),
                    Step::Rest => Ok(rest.clone()),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Buffer::concat_all(parts.iter(), sr, rest.channels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::freq::analyze;

    fn bass() -> Bass {
        Bass::new(Primitive::new(120.0).unwrap())
    }

    #[test]
    fn test_note_length_follows_tempo() {
        let b = bass().generate_note(&BassNote::default()).unwrap();
        // a quarter bar at 120 bpm is one beat, 500 ms
        assert_eq!(b.len(), 22050);
        assert!((b.peak() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_note_range() {
        let b = bass();
        for f in [19.9, 2000.1, -1.0] {
            let note = BassNote { frequency: f, ..BassNote::default() };
            assert!(matches!(b.generate_note(&note), Err(Error::FrequencyOutOfRange { .. })));
        }
        for f in [20.0, 2000.0] {
            let note = BassNote { frequency: f, ..BassNote::default() };
            assert!(b.generate_note(&note).is_ok());
        }
    }

    #[test]
    fn test_filter_darkens_saw() {
        let b = bass();
        let bright = BassNote { filter_cutoff: 8000.0, ..BassNote::default() };
        let dark = BassNote { filter_cutoff: 200.0, ..BassNote::default() };
        let bright = analyze(&b.generate_note(&bright).unwrap());
        let dark = analyze(&b.generate_note(&dark).unwrap());
        assert!(dark.percentage("high_mids").unwrap() < bright.percentage("high_mids").unwrap());
    }

    #[test]
    fn test_all_waveforms_render() {
        for waveform in [Waveform::Saw, Waveform::Square, Waveform::Sine, Waveform::Triangle] {
            let note = BassNote { waveform, ..BassNote::default() };
            assert_eq!(bass().generate_note(&note).unwrap().len(), 22050);
        }
    }

    #[test]
    fn test_pattern_steps() {
        let b = bass();
        let out = b.generate_303_pattern(&[40, 42, 45, 47], "x-.-").unwrap();
        assert_eq!(out.len(), 4 * 22050);
        // rests are silent
        assert!(out.samples()[22050..44100].iter().all(|&x| x == 0.0));
        // accents are 3 dB hotter than the normalized plain notes
        let accent_peak = out.slice(1000.0, 1500.0).unwrap().peak();
        assert!((accent_peak - crate::analysis::volume::db_to_amp(3.0)).abs() < 1e-3);
    }

    #[test]
    fn test_pattern_rejects_bad_input() {
        let b = bass();
        assert!(matches!(b.generate_303_pattern(&[], "x"), Err(Error::InvalidParameter { .. })));
        assert!(matches!(b.generate_303_pattern(&[40], "x-o"), Err(Error::InvalidParameter { .. })));
        assert!(b.generate_303_pattern(&[40], "").unwrap().is_empty());
    }
}
