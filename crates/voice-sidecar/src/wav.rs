//! Minimal WAV decoding: bytes in, mono `f32` samples + sample rate out.
//! Multipart framing itself is handled by the HTTP layer; this module only
//! owns turning a `.wav` byte buffer into the `(audio, sr)` pair every
//! other voice component consumes.

use std::io::Cursor;

use jarvis_domain::error::{Error, Result};

pub struct Decoded {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub fn decode_wav(bytes: &[u8]) -> Result<Decoded> {
    let cursor = Cursor::new(bytes);
    let mut reader =
        hound::WavReader::new(cursor).map_err(|e| Error::Validation(format!("invalid wav: {e}")))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let mono: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples: Vec<f32> = reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Validation(format!("invalid wav: {e}")))?;
            downmix(&samples, channels)
        }
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => {
                let samples: Vec<f32> = reader
                    .samples::<i8>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::Validation(format!("invalid wav: {e}")))?
                    .into_iter()
                    .map(|s| s as f32 / i8::MAX as f32)
                    .collect();
                downmix(&samples, channels)
            }
            16 => {
                let samples: Vec<f32> = reader
                    .samples::<i16>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::Validation(format!("invalid wav: {e}")))?
                    .into_iter()
                    .map(|s| s as f32 / i16::MAX as f32)
                    .collect();
                downmix(&samples, channels)
            }
            32 => {
                let samples: Vec<f32> = reader
                    .samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::Validation(format!("invalid wav: {e}")))?
                    .into_iter()
                    .map(|s| s as f32 / i32::MAX as f32)
                    .collect();
                downmix(&samples, channels)
            }
            other => return Err(Error::Validation(format!("unsupported bit depth: {other}"))),
        },
    };

    Ok(Decoded {
        samples: mono,
        sample_rate: spec.sample_rate,
    })
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut writer = hound::WavWriter::new(cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        buf
    }

    #[test]
    fn decodes_mono_16bit() {
        let samples: Vec<i16> = vec![0, 16384, -16384, 0];
        let bytes = write_test_wav(16_000, 1, &samples);
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples.len(), 4);
        assert!((decoded.samples[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        // L, R pairs: (0, 10000), (10000, 0)
        let samples: Vec<i16> = vec![0, 10000, 10000, 0];
        let bytes = write_test_wav(16_000, 2, &samples);
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.samples.len(), 2);
        assert!((decoded.samples[0] - decoded.samples[1]).abs() < 1e-6);
    }
}
