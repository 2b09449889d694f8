//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::AnalysisError;

/// Average per-channel sample sequences into one mono sequence
///
/// # Arguments
///
/// * `channels` - One sample sequence per channel, all the same length
///
/// # Errors
///
/// Returns `AnalysisError::EmptyInput` if there are no channels and
/// `AnalysisError::InvalidParameter` if the channel lengths differ.
///
/// # Example
///
/// ```
/// use hpcp_key::preprocessing::channel_mixer::downmix;
///
/// let mono = downmix(&[vec![1.0, 0.0], vec![0.0, 1.0]])?;
/// assert_eq!(mono, vec![0.5, 0.5]);
/// # Ok::<(), hpcp_key::AnalysisError>(())
/// ```
pub fn downmix(channels: &[Vec<f64>]) -> Result<Vec<f64>, AnalysisError> {
    let first = channels
        .first()
        .ok_or_else(|| AnalysisError::EmptyInput("No channels to downmix".to_string()))?;

    if let Some(bad) = channels.iter().find(|c| c.len() != first.len()) {
        return Err(AnalysisError::InvalidParameter(format!(
            "Channel lengths differ: {} vs {}",
            first.len(),
            bad.len()
        )));
    }

    log::debug!("Downmixing {} channels of {} samples", channels.len(), first.len());

    if channels.len() == 1 {
        return Ok(first.clone());
    }

    let scale = 1.0 / channels.len() as f64;
    let mut mono = vec![0.0; first.len()];
    for channel in channels {
        for (m, &s) in mono.iter_mut().zip(channel.iter()) {
            *m += s;
        }
    }
    for m in mono.iter_mut() {
        *m *= scale;
    }
    Ok(mono)
}

/// Split interleaved samples (`L R L R ...`) into per-channel sequences
///
/// A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidParameter` if `channels` is 0.
pub fn deinterleave(samples: &[f64], channels: usize) -> Result<Vec<Vec<f64>>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidParameter(
            "Channel count must be > 0".to_string(),
        ));
    }

    let frames = samples.len() / channels;
    let mut output = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in output.iter_mut().zip(frame.iter()) {
            channel.push(sample);
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_average() {
        let mono = downmix(&[vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]]).unwrap();
        assert_eq!(mono, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_downmix_single_channel() {
        let mono = downmix(&[vec![0.25, -0.5]]).unwrap();
        assert_eq!(mono, vec![0.25, -0.5]);
    }

    #[test]
    fn test_downmix_errors() {
        assert!(matches!(downmix(&[]), Err(AnalysisError::EmptyInput(_))));
        assert!(matches!(
            downmix(&[vec![1.0], vec![1.0, 2.0]]),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_deinterleave() {
        let channels = deinterleave(&[1.0, -1.0, 2.0, -2.0, 3.0], 2).unwrap();
        assert_eq!(channels, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
        assert!(deinterleave(&[1.0], 0).is_err());
        assert_eq!(deinterleave(&[], 3).unwrap(), vec![Vec::<f64>::new(); 3]);
    }
}
