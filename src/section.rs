//! Arrangement sections built from repeated phrases.
//!
//! Every section is exactly as long as its bar count at the phrase tempo.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::filter::filter_sweep;
use crate::phrase::{volumes, Element, Phrase, Volumes};

/// Bars per buildup stage.
const STAGE_BARS: u32 = 4;
/// Gain added per quarter of a buildup.
const BUILDUP_STEP_DB: f32 = 1.5;
const BUILDUP_SWEEP_START_HZ: f32 = 800.0;
const BUILDUP_SWEEP_END_HZ: f32 = 8000.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroStyle {
    /// Quiet kick alone, then kick and a subtle bass.
    #[default]
    Minimal,
    /// Loud kick from the first beat.
    Industrial,
}

pub struct SectionBuilder {
    phrase: Phrase,
}

impl SectionBuilder {
    pub fn new(phrase: Phrase) -> Self {
        SectionBuilder { phrase }
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    fn check_bars(bars: u32) -> Result<()> {
        if bars == 0 {
            return Err(Error::invalid("bars", bars, "a section of at least 1 bar"));
        }
        Ok(())
    }

    fn frames(&self, bars: u32) -> usize {
        let ctx = self.phrase.context();
        ctx.timing().bars_to_samples(bars as f64, ctx.sample_rate())
    }

    /// One phrase of `elements`, looped or cut to exactly `bars`.
    fn fill(&self, bars: u32, elements: &[Element], volumes: &Volumes) -> Result<Buffer> {
        let ms = self.phrase.context().timing().bars_to_ms(bars as f64);
        self.phrase.build(elements, volumes)?.repeat_to(ms)
    }

    pub fn intro(&self, bars: u32, style: IntroStyle) -> Result<Buffer> {
        Self::check_bars(bars)?;
        debug!(bars, ?style, "intro");
        match style {
            IntroStyle::Minimal => {
                let half = bars / 2;
                let second = self.fill(bars - half, &[Element::Kick, Element::Bass], &volumes(&[(Element::Kick, -1.0), (Element::Bass, -4.0)]))?;
                if half == 0 {
                    return Ok(second);
                }
                let first = self.fill(half, &[Element::Kick], &volumes(&[(Element::Kick, -2.0)]))?;
                Ok(first.concat(&second)?.fit_frames(self.frames(bars)))
            }
            IntroStyle::Industrial => self.fill(bars, &[Element::Kick], &volumes(&[(Element::Kick, 2.0)])),
        }
    }

    /// Rising tension in 4-bar stages.
    ///
    /// Stages add elements and volume as they go. With `sweep` the section
    /// also gets louder in four steps of 1.5 dB and a low-pass opens from
    /// 800 Hz to 8 kHz across it.
    pub fn buildup(&self, bars: u32, sweep: bool) -> Result<Buffer> {
        Self::check_bars(bars)?;
        debug!(bars, sweep, "buildup");
        let n_stages = (bars + STAGE_BARS - 1) / STAGE_BARS;
        let stages = (0..n_stages)
            .map(|stage| {
                let stage_bars = STAGE_BARS.min(bars - stage * STAGE_BARS);
                let (elements, vols) = match stage {
                    0 => (vec![Element::Kick, Element::Bass], volumes(&[(Element::Kick, 0.0), (Element::Bass, -3.0)])),
                    1 => (vec![Element::Kick, Element::Bass], volumes(&[(Element::Kick, 0.0), (Element::Bass, -2.0)])),
                    2 => (Element::ALL.to_vec(), volumes(&[(Element::Kick, 1.0), (Element::Bass, -1.0), (Element::Hats, -2.0)])),
                    _ => (Element::ALL.to_vec(), volumes(&[(Element::Kick, 1.5), (Element::Bass, 0.0), (Element::Hats, -1.0)])),
                };
                self.fill(stage_bars, &elements, &vols)
            })
            .collect::<Result<Vec<_>>>()?;

        let ctx = self.phrase.context();
        let section = Buffer::concat_all(stages.iter(), ctx.sample_rate(), stages[0].channels())?.fit_frames(self.frames(bars));
        if !sweep {
            return Ok(section);
        }
        let automated = stepped_gain(&section, 4, BUILDUP_STEP_DB)?;
        filter_sweep(&automated, BUILDUP_SWEEP_START_HZ, BUILDUP_SWEEP_END_HZ, None)
    }

    /// Full energy: kick at `2 * energy` dB, bass at 0 dB, hats at `energy` dB.
    pub fn drop(&self, bars: u32, energy: f32) -> Result<Buffer> {
        Self::check_bars(bars)?;
        debug!(bars, energy, "drop");
        let vols = volumes(&[(Element::Kick, 2.0 * energy), (Element::Bass, 0.0), (Element::Hats, energy)]);
        self.fill(bars, &Element::ALL, &vols)
    }

    /// Thinned out section without the `remove`d elements.
    pub fn breakdown(&self, bars: u32, remove: &[Element]) -> Result<Buffer> {
        Self::check_bars(bars)?;
        debug!(bars, ?remove, "breakdown");
        let keep: Vec<Element> = Element::ALL.iter().copied().filter(|e| !remove.contains(e)).collect();
        self.fill(bars, &keep, &volumes(&[(Element::Kick, -1.0), (Element::Bass, -2.0)]))
    }

    /// A breakdown without hats, fading out over its second half when `fade_out`.
    pub fn outro(&self, bars: u32, fade_out: bool) -> Result<Buffer> {
        let section = self.breakdown(bars, &[Element::Hats])?;
        if fade_out {
            Ok(section.fade_out(section.duration_ms() / 2.0))
        } else {
            Ok(section)
        }
    }
}

/// Split into `steps` equal parts and raise part `i` by `i * step_db`.
/// The last part absorbs any remainder.
fn stepped_gain(buffer: &Buffer, steps: usize, step_db: f32) -> Result<Buffer> {
    let width = buffer.channels().count() as usize;
    let chunk = buffer.frames() / steps * width;
    let samples = buffer.samples();
    let mut out = Vec::with_capacity(samples.len());
    for i in 0..steps {
        let end = if i + 1 == steps { samples.len() } else { (i + 1) * chunk };
        let part = Buffer::new(samples[i * chunk..end].to_vec(), buffer.sample_rate(), buffer.channels())?;
        out.extend(part.gain(i as f32 * step_db).into_samples());
    }
    Buffer::new(out, buffer.sample_rate(), buffer.channels())
}
