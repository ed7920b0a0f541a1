use crate::analysis::volume::db_to_amp;
use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Instantaneous peak compression.
///
/// Every sample above the threshold keeps `1 / ratio` of its excess. There is
/// no envelope follower: `attack_ms` and `release_ms` are validated and
/// otherwise unused.
///
/// # Parameters
/// - `threshold_db`: level above which reduction starts.
/// - `ratio`: 4 means 4 dB over the threshold comes out as 1 dB. Must be >= 1.
///
/// # Returns
/// The compressed signal, same length and format.
pub fn compress(buffer: &Buffer, threshold_db: f32, ratio: f32, attack_ms: f32, release_ms: f32) -> Result<Buffer> {
    if !(ratio >= 1.0) || !ratio.is_finite() {
        return Err(Error::invalid("ratio", ratio, "a ratio >= 1"));
    }
    if !(attack_ms >= 0.0) {
        return Err(Error::invalid("attack_ms", attack_ms, "a time >= 0 ms"));
    }
    if !(release_ms >= 0.0) {
        return Err(Error::invalid("release_ms", release_ms, "a time >= 0 ms"));
    }
    let threshold = db_to_amp(threshold_db);
    Ok(buffer.map(|x| {
        let level = x.abs();
        if level > threshold {
            let excess = level - threshold;
            x.signum() * (threshold + excess / ratio)
        } else {
            x
        }
    }))
}

/// Hard ceiling at `±10^(ceiling_db / 20)`.
pub fn limit(buffer: &Buffer, ceiling_db: f32) -> Result<Buffer> {
    if !ceiling_db.is_finite() {
        return Err(Error::invalid("ceiling_db", ceiling_db, "a finite level in dB"));
    }
    let ceiling = db_to_amp(ceiling_db);
    Ok(buffer.map(|x| x.clamp(-ceiling, ceiling)))
}
