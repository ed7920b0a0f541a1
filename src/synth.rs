/// This module provides the settings for the application's synthesis engine.
/// It includes definitions for Sample Rate, Nyquist frequency and the
/// 16-bit quantization scale shared by export and import.
///
/// The module also offers convenient aliases for standard constants at f32 precision.

pub const pi: f32 = std::f32::consts::PI;
pub const pi2: f32 = pi * 2f32;

/// Pre-quantization sample data. Interleaved when stereo.
pub type SampleBuffer = Vec<f32>;

pub const SR: u32 = 44100;

/// Full scale of a signed 16-bit sample.
pub const I16_SCALE: f32 = 32768f32;

/// Nyquist frequency for an arbitrary sample rate.
#[inline]
pub fn nyquist(sample_rate: u32) -> f32 {
    sample_rate as f32 / 2f32
}

/// Number of samples needed to hold `seconds` of signal.
#[inline]
pub fn n_samples(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0f32) * sample_rate as f32).round() as usize
}

/// Equal power white noise sample in [-1, 1].
#[inline]
pub fn noise_sample<R: rand::Rng>(rng: &mut R) -> f32 {
    2f32 * rng.gen::<f32>() - 1f32
}

/// Convert a MIDI note number into its frequency in Hz (A4 = 440).
pub fn midi_to_freq(note: u8) -> f32 {
    440f32 * 2f32.powf((note as f32 - 69f32) / 12f32)
}
