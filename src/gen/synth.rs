use rayon::prelude::*;
use tracing::debug;

use super::Stems;
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::phrase::{Element, Phrase};
use crate::presets::{KickStyle, Primitive};

/// Stems rendered from the phrase patterns: kicks on every beat, eighth-note
/// bass and sixteenth hats.
pub struct SynthGenerator {
    ctx: Primitive,
}

impl SynthGenerator {
    pub fn new(ctx: Primitive) -> Self {
        SynthGenerator { ctx }
    }

    pub fn context(&self) -> &Primitive {
        &self.ctx
    }

    /// A stem exactly `bars` long.
    pub fn stem(&self, element: Element, bars: u32, style: KickStyle) -> Result<Buffer> {
        if bars == 0 {
            return Err(Error::invalid("bars", bars, "a stem of at least 1 bar"));
        }
        debug!(element = element.name(), bars, "synth stem");
        let layer = Phrase::new(self.ctx).with_kick_style(style).layer(element)?;
        layer.repeat_to(self.ctx.timing().bars_to_ms(bars as f64))
    }

    pub fn all_stems(&self, bars: u32, style: KickStyle) -> Result<Stems> {
        Element::ALL
            .par_iter()
            .map(|&element| Ok((element, self.stem(element, bars, style)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> SynthGenerator {
        SynthGenerator::new(Primitive::new(124.0).unwrap().with_seed(Some(4)))
    }

    #[test]
    fn test_stem_lengths() {
        let g = generator();
        let ctx = *g.context();
        for bars in [1, 8, 10] {
            let stem = g.stem(Element::Bass, bars, KickStyle::Minimal).unwrap();
            assert_eq!(stem.len(), ctx.timing().bars_to_samples(bars as f64, ctx.sample_rate()));
        }
        assert!(g.stem(Element::Kick, 0, KickStyle::Minimal).is_err());
    }

    #[test]
    fn test_all_stems() {
        let stems = generator().all_stems(2, KickStyle::Industrial).unwrap();
        assert_eq!(stems.len(), 3);
        assert!(stems.values().all(|s| s.peak() > 0.0));
        let lens: Vec<usize> = stems.values().map(|s| s.len()).collect();
        assert!(lens.iter().all(|&n| n == lens[0]));
    }
}
