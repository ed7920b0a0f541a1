use std::path::Path;

use hound::SampleFormat;

use crate::buffer::{Buffer, Channels};
use crate::error::{Error, Result};

/// Read a mono or stereo WAV file, either 16-bit integer or 32-bit float.
pub fn read_wav(path: impl AsRef<Path>) -> Result<Buffer> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = Channels::from_count(spec.channels)?;
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => {
            let samples = reader.samples::<i16>().collect::<std::result::Result<Vec<_>, _>>()?;
            Buffer::from_i16(&samples, spec.sample_rate, channels)
        }
        (SampleFormat::Float, 32) => {
            let samples = reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?;
            Buffer::new(samples, spec.sample_rate, channels)
        }
        (format, bits) => Err(Error::invalid(
            "wav format",
            format!("{:?} {}-bit", format, bits),
            "16-bit integer or 32-bit float samples",
        )),
    }
}
