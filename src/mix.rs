//! Subgenre mixers: a track structure, a phrase flavor and a mastering chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::filter::{high_pass, low_pass, DEFAULT_ORDER};
use crate::fx::{bit_crush, delay, waveshaper, Curve};
use crate::phrase::Phrase;
use crate::presets::{KickStyle, Primitive};
use crate::structure::{TrackComposer, TrackStructure};

const RUMBLE_HZ: f32 = 30.0;

pub trait Mixer: Send + Sync {
    /// The context every voice of the track renders from.
    fn context(&self) -> &Primitive;

    fn structure(&self) -> TrackStructure;

    /// The phrase every section repeats. Minimal kicks by default.
    fn phrase(&self) -> Phrase {
        Phrase::new(*self.context())
    }

    /// Mastering chain run over the composed track.
    fn apply_processing(&self, track: Buffer) -> Result<Buffer>;

    fn create_track(&self) -> Result<Buffer> {
        let structure = self.structure();
        info!(structure = %structure.name, bpm = self.context().bpm(), "creating track");
        let track = TrackComposer::new(self.phrase()).compose(&structure)?;
        self.apply_processing(track)
    }
}

/// Clean and dynamic. Only rumble is removed.
pub struct MinimalMixer {
    ctx: Primitive,
}

impl MinimalMixer {
    pub const DEFAULT_BPM: f64 = 124.0;

    pub fn new(ctx: Primitive) -> Self {
        MinimalMixer { ctx }
    }
}

impl Mixer for MinimalMixer {
    fn context(&self) -> &Primitive {
        &self.ctx
    }

    fn structure(&self) -> TrackStructure {
        TrackStructure::minimal_techno()
    }

    fn apply_processing(&self, track: Buffer) -> Result<Buffer> {
        high_pass(&track, RUMBLE_HZ, DEFAULT_ORDER)
    }
}

/// Distorted kicks, saturated and crushed master, loud.
pub struct IndustrialMixer {
    ctx: Primitive,
}

impl IndustrialMixer {
    pub const DEFAULT_BPM: f64 = 138.0;
    const DRIVE: f32 = 0.7;
    const BIT_DEPTH: u32 = 14;
    const BOOST_DB: f32 = 3.0;
    const HEADROOM_DB: f32 = 0.5;

    pub fn new(ctx: Primitive) -> Self {
        IndustrialMixer { ctx }
    }
}

impl Mixer for IndustrialMixer {
    fn context(&self) -> &Primitive {
        &self.ctx
    }

    fn structure(&self) -> TrackStructure {
        TrackStructure::industrial_techno()
    }

    fn phrase(&self) -> Phrase {
        Phrase::new(self.ctx).with_kick_style(KickStyle::Industrial)
    }

    fn apply_processing(&self, track: Buffer) -> Result<Buffer> {
        let track = waveshaper(&track, Self::DRIVE, Curve::Hard)?;
        let track = bit_crush(&track, Self::BIT_DEPTH)?;
        Ok(track.gain(Self::BOOST_DB).normalize_headroom(Self::HEADROOM_DB))
    }
}

/// Muffled and echoing.
pub struct DubMixer {
    ctx: Primitive,
}

impl DubMixer {
    pub const DEFAULT_BPM: f64 = 118.0;
    const CUTOFF_HZ: f32 = 4000.0;
    const DELAY_MS: f64 = 500.0;
    const FEEDBACK: f32 = 0.7;
    const MIX: f32 = 0.6;

    pub fn new(ctx: Primitive) -> Self {
        DubMixer { ctx }
    }
}

impl Mixer for DubMixer {
    fn context(&self) -> &Primitive {
        &self.ctx
    }

    fn structure(&self) -> TrackStructure {
        TrackStructure::dub_techno()
    }

    fn apply_processing(&self, track: Buffer) -> Result<Buffer> {
        let track = low_pass(&track, Self::CUTOFF_HZ, 0.0, DEFAULT_ORDER)?;
        let track = delay(&track, Self::DELAY_MS, Self::FEEDBACK, Self::MIX)?;
        high_pass(&track, RUMBLE_HZ, DEFAULT_ORDER)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Subgenre {
    Minimal,
    Industrial,
    Dub,
}

impl Subgenre {
    pub const ALL: [Subgenre; 3] = [Subgenre::Minimal, Subgenre::Industrial, Subgenre::Dub];

    pub fn name(self) -> &'static str {
        match self {
            Subgenre::Minimal => "minimal",
            Subgenre::Industrial => "industrial",
            Subgenre::Dub => "dub",
        }
    }

    pub fn default_bpm(self) -> f64 {
        match self {
            Subgenre::Minimal => MinimalMixer::DEFAULT_BPM,
            Subgenre::Industrial => IndustrialMixer::DEFAULT_BPM,
            Subgenre::Dub => DubMixer::DEFAULT_BPM,
        }
    }

    pub fn structure(self) -> TrackStructure {
        match self {
            Subgenre::Minimal => TrackStructure::minimal_techno(),
            Subgenre::Industrial => TrackStructure::industrial_techno(),
            Subgenre::Dub => TrackStructure::dub_techno(),
        }
    }

    /// The mixer for this subgenre at `bpm`, or its default tempo.
    pub fn mixer(self, bpm: Option<f64>, seed: Option<u64>) -> Result<Box<dyn Mixer>> {
        let ctx = Primitive::new(bpm.unwrap_or(self.default_bpm()))?.with_seed(seed);
        Ok(match self {
            Subgenre::Minimal => Box::new(MinimalMixer::new(ctx)),
            Subgenre::Industrial => Box::new(IndustrialMixer::new(ctx)),
            Subgenre::Dub => Box::new(DubMixer::new(ctx)),
        })
    }
}

impl fmt::Display for Subgenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Subgenre {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Subgenre::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::volume::db_to_amp;

    fn ctx(bpm: f64) -> Primitive {
        Primitive::new(bpm).unwrap().with_seed(Some(8))
    }

    fn test_tone() -> Buffer {
        let samples = (0..44100).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect();
        Buffer::mono(samples, 44100).unwrap()
    }

    #[test]
    fn test_subgenre_names_and_tempi() {
        assert_eq!("Dub".parse::<Subgenre>().unwrap(), Subgenre::Dub);
        assert!(matches!("trance".parse::<Subgenre>(), Err(Error::UnknownPreset(_))));
        assert_eq!(Subgenre::Minimal.default_bpm(), 124.0);
        assert_eq!(Subgenre::Industrial.default_bpm(), 138.0);
        assert_eq!(Subgenre::Dub.default_bpm(), 118.0);
        assert_eq!(Subgenre::Industrial.to_string(), "industrial");
    }

    #[test]
    fn test_mixer_uses_requested_tempo() {
        let m = Subgenre::Dub.mixer(Some(120.0), None).unwrap();
        assert_eq!(m.context().bpm(), 120.0);
        let m = Subgenre::Minimal.mixer(None, None).unwrap();
        assert_eq!(m.context().bpm(), 124.0);
        assert_eq!(m.structure().name, "minimal_30s");
        assert!(Subgenre::Minimal.mixer(Some(0.0), None).is_err());
    }

    #[test]
    fn test_industrial_chain_is_loud_and_bounded() {
        let out = IndustrialMixer::new(ctx(138.0)).apply_processing(test_tone()).unwrap();
        assert_eq!(out.len(), 44100);
        assert!((out.peak() - db_to_amp(-0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_minimal_chain_keeps_length() {
        let out = MinimalMixer::new(ctx(124.0)).apply_processing(test_tone()).unwrap();
        assert_eq!(out.len(), 44100);
        assert!(out.peak() > 0.4);
    }

    #[test]
    fn test_dub_chain_echoes() {
        let out = DubMixer::new(ctx(118.0)).apply_processing(test_tone()).unwrap();
        assert_eq!(out.len(), 44100);
        assert!(out.peak() > 0.9);
    }

    #[test]
    fn test_industrial_phrase_uses_industrial_kick() {
        let m = IndustrialMixer::new(ctx(138.0));
        let kick = m.phrase().layer(crate::phrase::Element::Kick).unwrap();
        let minimal = Phrase::new(ctx(138.0)).layer(crate::phrase::Element::Kick).unwrap();
        assert_ne!(kick, minimal);
    }
}
