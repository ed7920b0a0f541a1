//! The 8-bar phrase, the basic unit of a techno arrangement.
//!
//! Each element (kick, bass, hats) is rendered as its own layer exactly one
//! phrase long, then the layers are summed with per-element gain.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buffer::{frames_for_ms, Buffer};
use crate::error::{Error, Result};
use crate::presets::{Bass, BassNote, HiHat, Kick, KickStyle, Primitive};
use crate::synth::{midi_to_freq, SampleBuffer};
use crate::time_forms::Waveform;

pub const PHRASE_BARS: u32 = 8;

/// E2, F#2, A2, B2.
pub const DEFAULT_BASS_NOTES: [u8; 4] = [40, 42, 45, 47];

/// Sixteenth steps of a bar that carry a kick in the broken pattern.
const BROKEN_STEPS: [usize; 4] = [0, 3, 8, 11];

const BASS_NOTE_BARS: f64 = 0.125;
const HAT_CLOSEDNESS: [f32; 2] = [0.9, 0.7];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Kick,
    Bass,
    Hats,
}

impl Element {
    pub const ALL: [Element; 3] = [Element::Kick, Element::Bass, Element::Hats];

    pub fn name(self) -> &'static str {
        match self {
            Element::Kick => "kick",
            Element::Bass => "bass",
            Element::Hats => "hats",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KickPattern {
    /// Every beat.
    FourOnFloor,
    /// Every eighth note.
    Double,
    /// Syncopated sixteenths, skipping beats two and four.
    Broken,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BassRhythm {
    EighthNotes,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatDensity {
    Sixteenths,
    Eighths,
}

/// Gain in dB per element. Missing elements play at 0 dB.
pub type Volumes = HashMap<Element, f32>;

/// Build a [`Volumes`] map from pairs.
pub fn volumes(pairs: &[(Element, f32)]) -> Volumes {
    pairs.iter().copied().collect()
}

/// Add `hit` into `target` starting at frame `start`, dropping what falls past the end.
fn mix_at(target: &mut SampleBuffer, hit: &[f32], start: usize) {
    if start >= target.len() {
        return;
    }
    for (out, &x) in target[start..].iter_mut().zip(hit) {
        *out += x;
    }
}

#[derive(Clone, Debug)]
pub struct Phrase {
    ctx: Primitive,
    kick_style: KickStyle,
    kick_pattern: KickPattern,
    bass_notes: Vec<u8>,
    bass_rhythm: BassRhythm,
    hat_density: HatDensity,
}

impl Phrase {
    /// Minimal kicks on every beat, eighth-note bass on the default notes and sixteenth hats.
    pub fn new(ctx: Primitive) -> Self {
        Phrase {
            ctx,
            kick_style: KickStyle::Minimal,
            kick_pattern: KickPattern::FourOnFloor,
            bass_notes: DEFAULT_BASS_NOTES.to_vec(),
            bass_rhythm: BassRhythm::EighthNotes,
            hat_density: HatDensity::Sixteenths,
        }
    }

    pub fn with_kick_style(self, kick_style: KickStyle) -> Self {
        Phrase { kick_style, ..self }
    }

    pub fn with_kick_pattern(self, kick_pattern: KickPattern) -> Self {
        Phrase { kick_pattern, ..self }
    }

    pub fn with_bass_notes(self, bass_notes: Vec<u8>) -> Self {
        Phrase { bass_notes, ..self }
    }

    pub fn with_hat_density(self, hat_density: HatDensity) -> Self {
        Phrase { hat_density, ..self }
    }

    pub fn context(&self) -> &Primitive {
        &self.ctx
    }

    pub fn duration_ms(&self) -> f64 {
        self.ctx.timing().bars_to_ms(PHRASE_BARS as f64)
    }

    /// Frames in one phrase.
    pub fn frames(&self) -> usize {
        self.ctx.timing().bars_to_samples(PHRASE_BARS as f64, self.ctx.sample_rate())
    }

    /// Lay `hits` (offset in ms, index into `sounds`) over one phrase of silence.
    fn arrange(&self, sounds: &[Buffer], hits: impl Iterator<Item = (f64, usize)>) -> Result<Buffer> {
        let sr = self.ctx.sample_rate();
        let mut samples = vec![0f32; self.frames()];
        for (offset_ms, sound) in hits {
            mix_at(&mut samples, sounds[sound].samples(), frames_for_ms(offset_ms, sr));
        }
        Buffer::mono(samples, sr)
    }

    pub fn kick_pattern(&self, pattern: KickPattern) -> Result<Buffer> {
        let kick = Kick::new(self.ctx).render(self.kick_style)?;
        let t = self.ctx.timing();
        let bars = PHRASE_BARS as usize;
        let offsets: Vec<f64> = match pattern {
            KickPattern::FourOnFloor => (0..4 * bars).map(|i| i as f64 * t.ms_per_beat()).collect(),
            KickPattern::Double => (0..8 * bars).map(|i| i as f64 * t.ms_per_beat() / 2.0).collect(),
            KickPattern::Broken => (0..bars)
                .flat_map(|bar| BROKEN_STEPS.iter().map(move |&step| bar * 16 + step))
                .map(|step| step as f64 * t.ms_per_16th())
                .collect(),
        };
        self.arrange(&[kick], offsets.into_iter().map(|ms| (ms, 0)))
    }

    /// One note per eighth, cycling through `notes`.
    pub fn bass_pattern(&self, notes: &[u8], rhythm: BassRhythm) -> Result<Buffer> {
        if notes.is_empty() {
            return Err(Error::invalid("notes", "[]", "at least one MIDI note"));
        }
        let bass = Bass::new(self.ctx);
        let sounds = notes
            .iter()
            .map(|&note| {
                bass.generate_note(&BassNote {
                    frequency: midi_to_freq(note),
                    duration_bars: BASS_NOTE_BARS,
                    waveform: Waveform::Saw,
                    ..BassNote::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let t = self.ctx.timing();
        let hits = match rhythm {
            BassRhythm::EighthNotes => (0..8 * PHRASE_BARS as usize).map(|i| (i as f64 * t.ms_per_beat() / 2.0, i % notes.len())),
        };
        self.arrange(&sounds, hits)
    }

    /// Hats alternating slightly more and less closed.
    pub fn hat_pattern(&self, density: HatDensity) -> Result<Buffer> {
        let hat = HiHat::new(self.ctx);
        let sounds = HAT_CLOSEDNESS
            .iter()
            .map(|&c| hat.generate(crate::presets::hats::DEFAULT_DURATION_MS, c))
            .collect::<Result<Vec<_>>>()?;

        let t = self.ctx.timing();
        let (per_bar, spacing) = match density {
            HatDensity::Sixteenths => (16, t.ms_per_16th()),
            HatDensity::Eighths => (8, t.ms_per_beat() / 2.0),
        };
        let hits = (0..per_bar * PHRASE_BARS as usize).map(|i| (i as f64 * spacing, i % 2));
        self.arrange(&sounds, hits)
    }

    /// The layer for `element` using this phrase's configured patterns.
    pub fn layer(&self, element: Element) -> Result<Buffer> {
        match element {
            Element::Kick => self.kick_pattern(self.kick_pattern),
            Element::Bass => self.bass_pattern(&self.bass_notes, self.bass_rhythm),
            Element::Hats => self.hat_pattern(self.hat_density),
        }
    }

    /// Render and sum the requested layers. The result is exactly 8 bars long.
    pub fn build(&self, elements: &[Element], volumes: &Volumes) -> Result<Buffer> {
        let layers = elements
            .par_iter()
            .map(|&element| {
                let db = volumes.get(&element).copied().unwrap_or(0.0);
                Ok(self.layer(element)?.gain(db))
            })
            .collect::<Result<Vec<_>>>()?;

        let sr = self.ctx.sample_rate();
        let mut samples = vec![0f32; self.frames()];
        for layer in &layers {
            mix_at(&mut samples, layer.samples(), 0);
        }
        Buffer::mono(samples, sr)
    }
}
