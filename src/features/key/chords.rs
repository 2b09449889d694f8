//! Chord-based key templates
//!
//! Builds polyphonic key templates from a 12-bin key profile: each diatonic
//! chord of the key contributes its notes, weighted by the profile value of
//! the chord's scale degree, and every note contributes to its harmonics.
//! All builders are pure and compose by addition.

/// Add two 12-bin vectors
fn add(a: [f64; 12], b: [f64; 12]) -> [f64; 12] {
    let mut sum = a;
    for (s, x) in sum.iter_mut().zip(b.iter()) {
        *s += x;
    }
    sum
}

/// Energy of one note and its first `num_harmonics` harmonics
///
/// The `h`-th harmonic sits `12·log2(h)` semitones above `pitch_class` and
/// weighs `contribution · slope^(h-1)`. A harmonic that falls between two
/// pitch classes is split between them with a cos² law.
///
/// # Example
///
/// ```
/// use hpcp_key::features::key::chords::harmonic_contribution;
///
/// let bins = harmonic_contribution(0, 1.0, 2, 0.5);
/// // Fundamental and octave both land on pitch class 0
/// assert!((bins[0] - 1.5).abs() < 1e-12);
/// ```
pub fn harmonic_contribution(pitch_class: usize, contribution: f64, num_harmonics: usize, slope: f64) -> [f64; 12] {
    let mut bins = [0.0; 12];
    let mut weight = contribution;

    for harmonic in 1..=num_harmonics {
        let index = pitch_class as f64 + 12.0 * (harmonic as f64).log2();
        let before = index.floor();
        let after = index.ceil();

        if before == after {
            bins[before as usize % 12] += weight;
        } else {
            let to_before = (0.5 * std::f64::consts::PI * (index - before)).cos().powi(2);
            let to_after = (0.5 * std::f64::consts::PI * (after - index)).cos().powi(2);
            bins[before as usize % 12] += to_before * weight;
            bins[after as usize % 12] += to_after * weight;
        }

        weight *= slope;
    }

    bins
}

/// Sum of [`harmonic_contribution`] over several notes
pub fn chord_tones(pitch_classes: &[usize], contribution: f64, num_harmonics: usize, slope: f64) -> [f64; 12] {
    pitch_classes.iter().fold([0.0; 12], |acc, &pc| {
        add(acc, harmonic_contribution(pc % 12, contribution, num_harmonics, slope))
    })
}

/// Root, major third and fifth
pub fn major_triad(root: usize, contribution: f64, num_harmonics: usize, slope: f64) -> [f64; 12] {
    chord_tones(&[root, root + 4, root + 7], contribution, num_harmonics, slope)
}

/// Root, minor third and fifth
pub fn minor_triad(root: usize, contribution: f64, num_harmonics: usize, slope: f64) -> [f64; 12] {
    chord_tones(&[root, root + 3, root + 7], contribution, num_harmonics, slope)
}

/// Polyphonic major-key template
///
/// Always the I, IV and V major triads. Unless `use_three_chords` is set,
/// also the ii, iii and vi minor triads and the notes of the diminished vii.
pub fn polyphonic_major(
    profile: &[f64; 12],
    use_three_chords: bool,
    num_harmonics: usize,
    slope: f64,
) -> [f64; 12] {
    let mut template = major_triad(0, profile[0], num_harmonics, slope);
    template = add(template, major_triad(5, profile[5], num_harmonics, slope));
    template = add(template, major_triad(7, profile[7], num_harmonics, slope));

    if !use_three_chords {
        template = add(template, minor_triad(2, profile[2], num_harmonics, slope));
        template = add(template, minor_triad(4, profile[4], num_harmonics, slope));
        template = add(template, minor_triad(9, profile[9], num_harmonics, slope));
        template = add(template, chord_tones(&[11, 2, 5], profile[11], num_harmonics, slope));
    }

    template
}

/// Polyphonic minor-key template
///
/// Always the i and iv minor triads and the V major triad (harmonic minor).
/// Unless `use_three_chords` is set, also the diminished ii, the augmented
/// III, the VI major triad and the diminished vii.
pub fn polyphonic_minor(
    profile: &[f64; 12],
    use_three_chords: bool,
    num_harmonics: usize,
    slope: f64,
) -> [f64; 12] {
    let mut template = minor_triad(0, profile[0], num_harmonics, slope);
    template = add(template, minor_triad(5, profile[5], num_harmonics, slope));
    template = add(template, major_triad(7, profile[7], num_harmonics, slope));

    if !use_three_chords {
        template = add(template, chord_tones(&[2, 5, 8], profile[2], num_harmonics, slope));
        template = add(template, chord_tones(&[3, 7, 11], profile[3], num_harmonics, slope));
        template = add(template, major_triad(8, profile[8], num_harmonics, slope));
        template = add(template, chord_tones(&[11, 2, 5], profile[8], num_harmonics, slope));
    }

    template
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_harmonic_contribution_single() {
        let bins = harmonic_contribution(3, 2.0, 1, 0.6);
        assert_eq!(bins[3], 2.0);
        assert_eq!(bins.iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn test_harmonic_contribution_conserves_weight() {
        // Split harmonics keep their full weight: cos² + sin² = 1
        let bins = harmonic_contribution(0, 1.0, 4, 0.6);
        let expected = 1.0 + 0.6 + 0.36 + 0.216;
        assert!((bins.iter().sum::<f64>() - expected).abs() < EPSILON);
        // Third harmonic (7.02 semitones) lands mostly on the fifth
        assert!(bins[7] > 0.35 && bins[7] < 0.36);
        assert!(bins[8] < 1e-3);
    }

    #[test]
    fn test_harmonic_contribution_wraps() {
        // Third harmonic of pitch class 11 wraps onto classes 6 and 7
        let bins = harmonic_contribution(11, 1.0, 3, 1.0);
        assert!((bins[11] - 2.0).abs() < EPSILON);
        assert!(bins[6] > 0.99);
        assert!(bins[7] > 0.0);
    }

    #[test]
    fn test_triads() {
        let major = major_triad(0, 1.0, 1, 0.6);
        assert_eq!(major[0], 1.0);
        assert_eq!(major[4], 1.0);
        assert_eq!(major[7], 1.0);
        assert_eq!(major.iter().sum::<f64>(), 3.0);

        let minor = minor_triad(9, 1.0, 1, 0.6);
        assert_eq!(minor[9], 1.0);
        assert_eq!(minor[0], 1.0);
        assert_eq!(minor[4], 1.0);
    }

    #[test]
    fn test_polyphonic_three_chords() {
        let profile = [1.0; 12];
        let major = polyphonic_major(&profile, true, 1, 0.6);
        // I-IV-V cover the major scale; the tonic and fifth are shared
        let expected = [2.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 1.0];
        assert_eq!(major, expected);

        let full = polyphonic_major(&profile, false, 1, 0.6);
        assert!(full.iter().sum::<f64>() > major.iter().sum::<f64>());
    }

    #[test]
    fn test_polyphonic_minor() {
        let profile = [1.0; 12];
        let minor = polyphonic_minor(&profile, true, 1, 0.6);
        // i (0 3 7), iv (5 8 0), V (7 11 2)
        let expected = [2.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0];
        assert_eq!(minor, expected);
    }
}
