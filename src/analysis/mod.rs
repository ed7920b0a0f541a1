pub mod freq;
pub mod volume;

pub use freq::{analyze, carve_frequency_space, FrequencyBand, FrequencyMap, FrequencyReport};
