//! Whole-track arrangement: an ordered list of sections and the composer
//! that renders it.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buffer::Buffer;
use crate::error::Result;
use crate::phrase::{Element, Phrase};
use crate::section::{IntroStyle, SectionBuilder};

const MINIMAL_HEADROOM_DB: f32 = 1.0;
const DEFAULT_HEADROOM_DB: f32 = 0.5;

/// What a section does. Several names share a renderer: `develop` is a
/// buildup, `climax` and `main` are drops. Unknown names render as a drop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Intro,
    Buildup,
    Develop,
    Drop,
    Climax,
    Main,
    Breakdown,
    Outro,
    #[serde(other)]
    Other,
}

fn default_remove() -> Vec<Element> {
    vec![Element::Hats]
}

/// One entry of a track structure, e.g. `{"name": "intro", "bars": 16, "style": "minimal"}`.
/// Options that do not apply to the section kind are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionDef {
    #[serde(rename = "name")]
    pub kind: SectionKind,
    pub bars: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<IntroStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_sweep: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<Element>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<bool>,
}

impl SectionDef {
    pub fn new(kind: SectionKind, bars: u32) -> Self {
        SectionDef {
            kind,
            bars,
            style: None,
            energy: None,
            filter_sweep: None,
            remove: None,
            fade_out: None,
        }
    }

    pub fn with_style(self, style: IntroStyle) -> Self {
        SectionDef { style: Some(style), ..self }
    }

    pub fn with_energy(self, energy: f32) -> Self {
        SectionDef { energy: Some(energy), ..self }
    }

    pub fn with_filter_sweep(self, sweep: bool) -> Self {
        SectionDef { filter_sweep: Some(sweep), ..self }
    }

    pub fn with_remove(self, remove: Vec<Element>) -> Self {
        SectionDef { remove: Some(remove), ..self }
    }

    pub fn with_fade_out(self, fade_out: bool) -> Self {
        SectionDef { fade_out: Some(fade_out), ..self }
    }

    /// Render this section with `builder`.
    pub fn render(&self, builder: &SectionBuilder) -> Result<Buffer> {
        match self.kind {
            SectionKind::Intro => builder.intro(self.bars, self.style.unwrap_or_default()),
            SectionKind::Buildup | SectionKind::Develop => builder.buildup(self.bars, self.filter_sweep.unwrap_or(true)),
            SectionKind::Breakdown => {
                let remove = self.remove.clone().unwrap_or_else(default_remove);
                builder.breakdown(self.bars, &remove)
            }
            SectionKind::Outro => builder.outro(self.bars, self.fade_out.unwrap_or(false)),
            SectionKind::Drop | SectionKind::Climax | SectionKind::Main | SectionKind::Other => {
                builder.drop(self.bars, self.energy.unwrap_or(1.0))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackStructure {
    pub name: String,
    pub sections: Vec<SectionDef>,
    pub total_bars: u32,
}

impl TrackStructure {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Sum of the section lengths, which may differ from `total_bars`.
    pub fn section_bars(&self) -> u32 {
        self.sections.iter().map(|s| s.bars).sum()
    }

    /// Sparse and restrained, 64 bars.
    pub fn minimal_techno() -> Self {
        TrackStructure {
            name: "minimal_30s".into(),
            sections: vec![
                SectionDef::new(SectionKind::Intro, 16).with_style(IntroStyle::Minimal),
                SectionDef::new(SectionKind::Develop, 16).with_filter_sweep(true),
                SectionDef::new(SectionKind::Climax, 16).with_energy(0.8),
                SectionDef::new(SectionKind::Outro, 16).with_fade_out(true),
            ],
            total_bars: 64,
        }
    }

    /// Short intro and a long drop, 64 bars.
    pub fn industrial_techno() -> Self {
        TrackStructure {
            name: "industrial_30s".into(),
            sections: vec![
                SectionDef::new(SectionKind::Intro, 8).with_style(IntroStyle::Industrial),
                SectionDef::new(SectionKind::Buildup, 16),
                SectionDef::new(SectionKind::Drop, 24).with_energy(1.0),
                SectionDef::new(SectionKind::Breakdown, 8).with_remove(vec![Element::Hats]),
                SectionDef::new(SectionKind::Outro, 8).with_fade_out(true),
            ],
            total_bars: 64,
        }
    }

    /// One long looping main section, 96 bars.
    pub fn dub_techno() -> Self {
        TrackStructure {
            name: "dub_30s".into(),
            sections: vec![
                SectionDef::new(SectionKind::Intro, 16).with_style(IntroStyle::Minimal),
                SectionDef::new(SectionKind::Main, 64),
                SectionDef::new(SectionKind::Outro, 16).with_fade_out(true),
            ],
            total_bars: 96,
        }
    }
}

pub struct TrackComposer {
    builder: SectionBuilder,
}

impl TrackComposer {
    pub fn new(phrase: Phrase) -> Self {
        TrackComposer {
            builder: SectionBuilder::new(phrase),
        }
    }

    pub fn builder(&self) -> &SectionBuilder {
        &self.builder
    }

    /// Render every section, join them in order and normalize.
    ///
    /// Minimal structures keep 1 dB of headroom, all others 0.5 dB. A track
    /// longer than `total_bars` is cut there; a shorter one is left as is.
    pub fn compose(&self, structure: &TrackStructure) -> Result<Buffer> {
        info!(name = %structure.name, sections = structure.sections.len(), "composing");
        let sections = structure
            .sections
            .par_iter()
            .map(|def| {
                debug!(kind = ?def.kind, bars = def.bars, "building section");
                def.render(&self.builder)
            })
            .collect::<Result<Vec<_>>>()?;

        let ctx = self.builder.phrase().context();
        let track = match sections.first() {
            Some(first) => Buffer::concat_all(sections.iter(), ctx.sample_rate(), first.channels())?,
            None => Buffer::empty(ctx.sample_rate(), crate::buffer::Channels::Mono)?,
        };

        let headroom = if structure.name.contains("minimal") { MINIMAL_HEADROOM_DB } else { DEFAULT_HEADROOM_DB };
        let track = track.normalize_headroom(headroom);

        let target = ctx.timing().bars_to_samples(structure.total_bars as f64, ctx.sample_rate());
        let track = if track.frames() > target { track.fit_frames(target) } else { track };
        info!(name = %structure.name, seconds = track.duration_ms() / 1000.0, "track composed");
        Ok(track)
    }
}
