//! Stem sources: pure synthesis, or an external text-to-music model with
//! synthesis as the fallback.

use std::collections::BTreeMap;

use crate::buffer::Buffer;
use crate::phrase::Element;

pub mod model;
pub mod synth;

pub use model::ModelGenerator;
pub use synth::SynthGenerator;

/// One isolated track per element.
pub type Stems = BTreeMap<Element, Buffer>;
