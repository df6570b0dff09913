//! Pressure and contact-area stroke metrics

use std::f64::consts::PI;

use crate::stroke::types::{elapsed_ms, TouchSample};

/// Fewest samples for which a mid-stroke window is defined
const MID_STROKE_MIN_SAMPLES: usize = 3;

/// Mean pressure over the inclusive index window `[n/4, 3n/4]`.
///
/// The upper bound is inclusive, so for some lengths the window covers one
/// more sample than half the stroke. Matchers are trained on that window.
pub fn mid_stroke_pressure(samples: &[TouchSample]) -> f64 {
    let n = samples.len();
    if n < MID_STROKE_MIN_SAMPLES {
        return 0.0;
    }
    let lo = n / 4;
    let hi = (3 * n) / 4;
    let window = &samples[lo..=hi];
    window.iter().map(|s| s.pressure).sum::<f64>() / window.len() as f64
}

pub fn max_pressure(samples: &[TouchSample]) -> f64 {
    samples
        .iter()
        .map(|s| s.pressure)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
        .unwrap_or(0.0)
}

pub fn min_pressure(samples: &[TouchSample]) -> f64 {
    samples
        .iter()
        .map(|s| s.pressure)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))
        .unwrap_or(0.0)
}

/// Pressure of the touch-down sample
pub fn initial_pressure(samples: &[TouchSample]) -> f64 {
    samples.first().map(|s| s.pressure).unwrap_or(0.0)
}

/// Population variance of the pressure readings
pub fn pressure_variance(samples: &[TouchSample]) -> f64 {
    variance(samples.iter().map(|s| s.pressure))
}

/// Net pressure change per millisecond between the first and last sample
pub fn pressure_change_rate(samples: &[TouchSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let span = elapsed_ms(first.timestamp, last.timestamp);
    if span <= 0 {
        return 0.0;
    }
    (last.pressure - first.pressure) / span as f64
}

/// Sum of the digitizer's contact size over all samples
pub fn total_contact_size(samples: &[TouchSample]) -> f64 {
    samples.iter().map(|s| s.contact_size).sum()
}

/// Mean contact-ellipse area over samples that report both axes
pub fn average_contact_area(samples: &[TouchSample]) -> f64 {
    let areas: Vec<f64> = samples
        .iter()
        .filter(|s| s.contact_major > 0.0 && s.contact_minor > 0.0)
        .map(|s| PI * (s.contact_major / 2.0) * (s.contact_minor / 2.0))
        .collect();
    if areas.is_empty() {
        return 0.0;
    }
    areas.iter().sum::<f64>() / areas.len() as f64
}

/// Population variance; 0 for an empty series
pub(crate) fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(c, s), v| (c + 1, s + v));
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(pressures: &[f64]) -> Vec<TouchSample> {
        pressures
            .iter()
            .enumerate()
            .map(|(i, &p)| TouchSample::at(i as f64, 0.0, i as i64 * 10).with_pressure(p))
            .collect()
    }

    #[test]
    fn test_mid_stroke_pressure_requires_three_samples() {
        assert_eq!(mid_stroke_pressure(&pressed(&[0.5, 0.7])), 0.0);
        assert_eq!(mid_stroke_pressure(&[]), 0.0);
    }

    #[test]
    fn test_mid_stroke_pressure_inclusive_window() {
        // n = 5 → window [1, 3], three samples
        let samples = pressed(&[9.0, 0.2, 0.4, 0.6, 9.0]);
        assert!((mid_stroke_pressure(&samples) - 0.4).abs() < 1e-12);

        // n = 4 → window [1, 3], includes the last sample
        let samples = pressed(&[9.0, 0.3, 0.3, 0.6]);
        assert!((mid_stroke_pressure(&samples) - 0.4).abs() < 1e-12);

        // n = 3 → window [0, 2], the whole stroke
        let samples = pressed(&[0.1, 0.2, 0.3]);
        assert!((mid_stroke_pressure(&samples) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_pressure_extrema_and_initial() {
        let samples = pressed(&[0.5, 0.9, 0.1, 0.4]);
        assert_eq!(max_pressure(&samples), 0.9);
        assert_eq!(min_pressure(&samples), 0.1);
        assert_eq!(initial_pressure(&samples), 0.5);
        assert_eq!(max_pressure(&[]), 0.0);
        assert_eq!(min_pressure(&[]), 0.0);
        assert_eq!(initial_pressure(&[]), 0.0);
    }

    #[test]
    fn test_pressure_variance() {
        let samples = pressed(&[1.0, 3.0]);
        assert!((pressure_variance(&samples) - 1.0).abs() < 1e-12);
        assert_eq!(pressure_variance(&pressed(&[0.7])), 0.0);
        assert_eq!(pressure_variance(&[]), 0.0);
    }

    #[test]
    fn test_pressure_change_rate() {
        // 0.2 → 0.8 over 30 ms
        let samples = pressed(&[0.2, 0.5, 0.5, 0.8]);
        assert!((pressure_change_rate(&samples) - 0.02).abs() < 1e-12);

        let frozen = vec![
            TouchSample::at(0.0, 0.0, 5).with_pressure(0.1),
            TouchSample::at(1.0, 0.0, 5).with_pressure(0.9),
        ];
        assert_eq!(pressure_change_rate(&frozen), 0.0);
    }

    #[test]
    fn test_contact_areas() {
        let samples = vec![
            TouchSample::at(0.0, 0.0, 0).with_contact(0.2, 2.0, 2.0),
            TouchSample::at(1.0, 0.0, 10).with_contact(0.3, 4.0, 0.0),
            TouchSample::at(2.0, 0.0, 20).with_contact(0.1, 4.0, 2.0),
        ];
        assert!((total_contact_size(&samples) - 0.6).abs() < 1e-12);
        // (π·1·1 + π·2·1) / 2; the zero-minor sample is skipped
        assert!((average_contact_area(&samples) - 1.5 * PI).abs() < 1e-12);

        let bare = vec![TouchSample::at(0.0, 0.0, 0)];
        assert_eq!(average_contact_area(&bare), 0.0);
    }
}
