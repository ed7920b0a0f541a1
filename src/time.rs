//! Musical timing: everything in bars and beats, converted to milliseconds
//! and samples at a fixed tempo.

use crate::error::{Error, Result};

/// A point in musical time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MusicalTime {
    pub bars: u32,
    pub beats: u32,
    pub sixteenths: u32,
}

impl MusicalTime {
    pub fn new(bars: u32, beats: u32, sixteenths: u32) -> Result<Self> {
        if beats >= 4 {
            return Err(Error::invalid("beats", beats, "a beat index in [0, 4)"));
        }
        if sixteenths >= 4 {
            return Err(Error::invalid("sixteenths", sixteenths, "a sixteenth index in [0, 4)"));
        }
        Ok(MusicalTime { bars, beats, sixteenths })
    }

    pub fn to_beats(&self) -> f64 {
        self.bars as f64 * 4.0 + self.beats as f64 + self.sixteenths as f64 / 4.0
    }

    pub fn to_ms(&self, bpm: f64) -> Result<f64> {
        Ok(TimingCalculator::new(bpm)?.beats_to_ms(self.to_beats()))
    }
}

/// Tempo-derived durations. Built once per track or section and read-only thereafter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimingCalculator {
    bpm: f64,
    beats_per_bar: u32,
    note_value: u32,
    ms_per_beat: f64,
    ms_per_bar: f64,
    ms_per_16th: f64,
}

impl TimingCalculator {
    /// Common time (4/4) at `bpm`.
    pub fn new(bpm: f64) -> Result<Self> {
        TimingCalculator::with_time_signature(bpm, (4, 4))
    }

    pub fn with_time_signature(bpm: f64, (beats_per_bar, note_value): (u32, u32)) -> Result<Self> {
        if !(bpm > 0.0) || !bpm.is_finite() {
            return Err(Error::invalid("bpm", bpm, "a tempo > 0"));
        }
        if beats_per_bar == 0 || note_value == 0 {
            return Err(Error::invalid(
                "time_signature",
                format!("{}/{}", beats_per_bar, note_value),
                "a non-zero numerator and denominator",
            ));
        }
        let ms_per_beat = 60_000.0 / bpm;
        Ok(TimingCalculator {
            bpm,
            beats_per_bar,
            note_value,
            ms_per_beat,
            ms_per_bar: ms_per_beat * beats_per_bar as f64,
            ms_per_16th: ms_per_beat / 4.0,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn note_value(&self) -> u32 {
        self.note_value
    }

    pub fn ms_per_beat(&self) -> f64 {
        self.ms_per_beat
    }

    pub fn ms_per_bar(&self) -> f64 {
        self.ms_per_bar
    }

    pub fn ms_per_16th(&self) -> f64 {
        self.ms_per_16th
    }

    pub fn beats_to_ms(&self, beats: f64) -> f64 {
        beats * self.ms_per_beat
    }

    pub fn bars_to_ms(&self, bars: f64) -> f64 {
        bars * self.ms_per_bar
    }

    pub fn ms_to_bars(&self, ms: f64) -> f64 {
        ms / self.ms_per_bar
    }

    /// Snap to the closest bar line.
    pub fn nearest_bar(&self, ms: f64) -> f64 {
        (ms / self.ms_per_bar).round() * self.ms_per_bar
    }

    /// Snap to the closest beat.
    pub fn nearest_beat(&self, ms: f64) -> f64 {
        (ms / self.ms_per_beat).round() * self.ms_per_beat
    }

    /// Unrounded samples in one beat.
    pub fn samples_per_beat(&self, sample_rate: u32) -> f64 {
        self.ms_per_beat * sample_rate as f64 / 1000.0
    }

    pub fn ms_to_samples(&self, ms: f64, sample_rate: u32) -> usize {
        crate::buffer::frames_for_ms(ms, sample_rate)
    }

    pub fn bars_to_samples(&self, bars: f64, sample_rate: u32) -> usize {
        self.ms_to_samples(self.bars_to_ms(bars), sample_rate)
    }

    /// Millisecond positions of every division across `total_bars`.
    /// A subdivision of 16 yields 16th notes, 8 yields 8th notes.
    pub fn create_grid(&self, total_bars: u32, subdivision: u32) -> Result<Vec<f64>> {
        if subdivision == 0 {
            return Err(Error::invalid("subdivision", subdivision, "a subdivision > 0"));
        }
        let ms_per_division = self.ms_per_bar / subdivision as f64;
        Ok((0..total_bars * subdivision).map(|i| i as f64 * ms_per_division).collect())
    }
}
