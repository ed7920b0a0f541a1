use crate::buffer::{frames_for_ms, Buffer, Channels};
use crate::error::{Error, Result};
use crate::synth::SampleBuffer;

/// Echoes quieter than this are not rendered.
const MIN_ECHO_GAIN: f32 = 1e-4;

/// Haas offset of the synthesized right channel.
const HAAS_SECONDS: f32 = 0.015;
const HAAS_GAIN: f32 = 0.8;
const CROSS_MIX_PER_WIDTH: f32 = 0.3;

fn unit_interval(name: &'static str, x: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&x) {
        Ok(x)
    } else {
        Err(Error::invalid(name, x, "a value in [0, 1]"))
    }
}

/// Dry signal plus echoes at every multiple of `spacing`, echo n at `feedback^(n-1)`.
fn echoes(signal: &[f32], spacing: usize, feedback: f32) -> SampleBuffer {
    let mut wet = signal.to_vec();
    let mut n = 1;
    loop {
        let shift = n * spacing;
        let attenuation = feedback.powi(n as i32 - 1);
        if shift >= signal.len() || attenuation < MIN_ECHO_GAIN {
            break;
        }
        for (out, &x) in wet[shift..].iter_mut().zip(signal.iter()) {
            *out += attenuation * x;
        }
        n += 1;
    }
    wet
}

/// Feedback delay.
///
/// The result is `dry * (1 - mix) + wet * mix`, peak-normalized to full scale.
/// Normalization always happens; silent input stays silent. Stereo buffers
/// echo each channel on its own.
pub fn delay(buffer: &Buffer, delay_ms: f64, feedback: f32, mix: f32) -> Result<Buffer> {
    if !(delay_ms > 0.0) || !delay_ms.is_finite() {
        return Err(Error::invalid("delay_ms", delay_ms, "a delay > 0 ms"));
    }
    let feedback = unit_interval("feedback", feedback)?;
    let mix = unit_interval("mix", mix)?;
    let spacing = frames_for_ms(delay_ms, buffer.sample_rate()).max(1);

    let out = buffer.map_channels(|dry| {
        let wet = echoes(dry, spacing, feedback);
        Ok(dry.iter().zip(wet).map(|(&d, w)| d * (1.0 - mix) + w * mix).collect())
    })?;
    Ok(out.normalize())
}

/// Widen the stereo image. Output is always stereo and peak-normalized.
///
/// Mono input becomes pseudo-stereo: the right channel is the signal delayed
/// by 15 ms at 0.8 gain, and for `width != 1` each side takes
/// `(width - 1) * 0.3` of the other. Stereo input is split into mid and side,
/// the side is scaled by `width`, then recombined.
pub fn stereo_width(buffer: &Buffer, width: f32) -> Result<Buffer> {
    if !(width >= 0.0) || !width.is_finite() {
        return Err(Error::invalid("width", width, "a width >= 0"));
    }
    let sr = buffer.sample_rate();
    let (left, right) = match buffer.channels() {
        Channels::Mono => {
            let dry = buffer.samples();
            let offset = (HAAS_SECONDS * sr as f32) as usize;
            let mut delayed = vec![0f32; dry.len()];
            if offset < dry.len() {
                for (out, &x) in delayed[offset..].iter_mut().zip(dry.iter()) {
                    *out = x * HAAS_GAIN;
                }
            }
            if width != 1.0 {
                let cross = (width - 1.0) * CROSS_MIX_PER_WIDTH;
                let left = dry.iter().zip(&delayed).map(|(&l, &r)| l * (1.0 - cross) + r * cross).collect();
                let right = dry.iter().zip(&delayed).map(|(&l, &r)| r * (1.0 - cross) + l * cross).collect();
                (left, right)
            } else {
                (dry.to_vec(), delayed)
            }
        }
        Channels::Stereo => buffer
            .samples()
            .chunks_exact(2)
            .map(|lr| {
                let mid = (lr[0] + lr[1]) / 2.0;
                let side = (lr[0] - lr[1]) / 2.0 * width;
                (mid + side, mid - side)
            })
            .unzip(),
    };
    Ok(Buffer::from_channels(&left, &right, sr)?.normalize())
}
