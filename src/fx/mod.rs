//! Effects processors. Each takes a buffer by reference and returns a new one.

pub mod distortion;
pub mod dynamics;
pub mod spatial;

pub use distortion::{bit_crush, waveshaper, Curve};
pub use dynamics::{compress, limit};
pub use spatial::{delay, stereo_width};
