/// Better for linear modulation of amplitude
pub fn db_to_amp(db: f32) -> f32 {
    10f32.powf(db / 20f32)
}

pub fn amp_to_db(amplitude: f32) -> f32 {
    20.0 * amplitude.abs().max(f32::MIN_POSITIVE).log10()
}

/// Identify the RMS value of a signal slice.
/// Intended for short form slices or samples
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum: f32 = signal.iter().map(|&x| x * x).sum();
    (sum / signal.len() as f32).sqrt()
}
