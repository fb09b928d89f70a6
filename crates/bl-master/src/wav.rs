//! WAV encoding for 16-bit PCM.

use std::io::{Cursor, Seek, Write};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Write interleaved f32 samples as 16-bit PCM, clipping to [-1, 1].
pub fn write_wav<W: Write + Seek>(
    writer: W,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::new(writer, spec)?;
    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(quantized)?;
    }
    writer.finalize()
}

/// Encode into an in-memory WAV file.
pub fn samples_to_wav(
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, samples, channels, sample_rate)?;
    Ok(cursor.into_inner())
}
