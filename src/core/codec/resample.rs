//! Integer-ratio sample rate conversion.
//!
//! Upsampling repeats every sample `factor` times and downsampling keeps every
//! `factor`-th sample. There is no interpolation or anti-alias filtering: the
//! conversion costs one pass over the buffer and adds no delay, which is what
//! a live phone call wants. A filtered resampler can replace [`resample`]
//! without changing its signature.

use super::CodecError;

/// Convert `samples` from `source_rate` to `target_rate`.
///
/// Only integer ratios are supported (8 kHz ↔ 16 kHz, 8 kHz ↔ 24 kHz, ...).
pub fn resample(
    samples: &[i16],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<i16>, CodecError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(CodecError::UnsupportedRatio {
            source_rate,
            target_rate,
        });
    }

    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    if target_rate % source_rate == 0 {
        Ok(upsample(samples, (target_rate / source_rate) as usize))
    } else if source_rate % target_rate == 0 {
        Ok(downsample(samples, (source_rate / target_rate) as usize))
    } else {
        Err(CodecError::UnsupportedRatio {
            source_rate,
            target_rate,
        })
    }
}

/// Repeat each sample `factor` times.
pub fn upsample(samples: &[i16], factor: usize) -> Vec<i16> {
    let mut output = Vec::with_capacity(samples.len() * factor);
    for &sample in samples {
        output.extend(std::iter::repeat_n(sample, factor));
    }
    output
}

/// Keep every `factor`-th sample, starting with the first.
pub fn downsample(samples: &[i16], factor: usize) -> Vec<i16> {
    samples.iter().step_by(factor.max(1)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsample_repeats() {
        assert_eq!(upsample(&[1, 2], 3), vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_downsample_keeps_every_third() {
        assert_eq!(downsample(&[1, 1, 1, 2, 2, 2, 3], 3), vec![1, 2, 3]);
    }

    #[test]
    fn test_telephony_round_trip_is_exact() {
        let original: Vec<i16> = (-400..400).map(|v| (v * 37) as i16).collect();
        let wide = resample(&original, 8000, 24000).unwrap();
        assert_eq!(wide.len(), original.len() * 3);
        let narrow = resample(&wide, 24000, 8000).unwrap();
        assert_eq!(narrow, original);
    }

    #[test]
    fn test_sixteen_khz_ratio() {
        let upsampled = resample(&[5, -5], 8000, 16000).unwrap();
        assert_eq!(upsampled, vec![5, 5, -5, -5]);
    }

    #[test]
    fn test_same_rate_is_copy() {
        assert_eq!(resample(&[7, 8, 9], 24000, 24000).unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_unsupported_ratio() {
        let err = resample(&[1, 2, 3], 8000, 44100).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedRatio {
                source_rate: 8000,
                target_rate: 44100
            }
        ));
        assert!(resample(&[1], 0, 8000).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 8000, 24000).unwrap().is_empty());
        assert!(resample(&[], 24000, 8000).unwrap().is_empty());
    }
}
