#![allow(non_upper_case_globals)]
//! Procedural techno: synthesized kicks, basslines and hats arranged into
//! phrases, sections and whole tracks, mixed per subgenre.

pub mod analysis;
pub mod buffer;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod fx;
pub mod gen;
pub mod mix;
pub mod phrase;
pub mod preset;
pub mod presets;
pub mod reader;
pub mod render;
pub mod section;
pub mod structure;
pub mod synth;
pub mod time;
pub mod time_forms;

pub use buffer::{Buffer, Channels};
pub use error::{Error, Result};
