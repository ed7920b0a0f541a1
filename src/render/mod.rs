//! Getting buffers out of the process.
pub mod engrave;

pub use engrave::write_wav;
