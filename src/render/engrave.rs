use std::path::Path;

use crate::buffer::Buffer;
use crate::error::Result;

pub const BITS_PER_SAMPLE: u16 = 16;

/// Write `buffer` as 16-bit PCM, creating missing parent directories.
/// Samples are clipped to the 16-bit range on the way out.
pub fn write_wav(path: impl AsRef<Path>, buffer: &Buffer) -> Result<()> {
  let p = path.as_ref();
  if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)?;
  }
  let spec = hound::WavSpec {
    channels: buffer.channels().count(),
    sample_rate: buffer.sample_rate(),
    bits_per_sample: BITS_PER_SAMPLE,
    sample_format: hound::SampleFormat::Int,
  };
  let mut writer = hound::WavWriter::create(p, spec)?;
  for sample in buffer.to_i16() {
    writer.write_sample(sample)?;
  }
  writer.finalize()?;
  Ok(())
}
