//! Position-only stroke metrics
//!
//! Every function here reads only `x`/`y` and returns 0 for inputs too short to
//! define the metric.

use crate::stroke::types::TouchSample;

/// Euclidean distance between two samples
pub fn distance(a: &TouchSample, b: &TouchSample) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Sum of consecutive sample distances
pub fn trajectory_length(samples: &[TouchSample]) -> f64 {
    samples.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

/// Area of the axis-aligned bounding box over all samples
pub fn bounding_area(samples: &[TouchSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for s in samples {
        min_x = min_x.min(s.x);
        max_x = max_x.max(s.x);
        min_y = min_y.min(s.y);
        max_y = max_y.max(s.y);
    }
    (max_x - min_x) * (max_y - min_y)
}

/// Heading from the first to the last sample, in radians
pub fn end_to_end_direction(samples: &[TouchSample]) -> f64 {
    match endpoints(samples) {
        Some((first, last)) => (last.y - first.y).atan2(last.x - first.x),
        None => 0.0,
    }
}

/// Mean heading over every consecutive pair (zero-length pairs contribute 0)
pub fn average_direction(samples: &[TouchSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let total: f64 = samples
        .windows(2)
        .map(|w| (w[1].y - w[0].y).atan2(w[1].x - w[0].x))
        .sum();
    total / (samples.len() - 1) as f64
}

/// Net displacement (last − first) along each axis
pub fn displacement(samples: &[TouchSample]) -> (f64, f64) {
    match endpoints(samples) {
        Some((first, last)) => (last.x - first.x, last.y - first.y),
        None => (0.0, 0.0),
    }
}

/// Straight-line distance between the first and last sample
pub fn end_to_end_distance(samples: &[TouchSample]) -> f64 {
    match endpoints(samples) {
        Some((first, last)) => distance(first, last),
        None => 0.0,
    }
}

/// Ratio of end-to-end distance to the travelled path (1.0 = perfectly straight)
pub fn straightness_ratio(samples: &[TouchSample]) -> f64 {
    let path = trajectory_length(samples);
    if path <= 0.0 {
        return 0.0;
    }
    end_to_end_distance(samples) / path
}

/// Average path deviation: mean perpendicular distance of every sample from
/// the chord joining the first and last sample.
///
/// A closed gesture has no chord, so the mean distance from the start point is
/// used instead.
pub fn curvature(samples: &[TouchSample]) -> f64 {
    if samples.len() < 3 {
        return 0.0;
    }
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let (dx, dy) = (last.x - first.x, last.y - first.y);
    let chord = dx.hypot(dy);

    let total: f64 = if chord > 0.0 {
        samples
            .iter()
            .map(|s| (dy * (s.x - first.x) - dx * (s.y - first.y)).abs() / chord)
            .sum()
    } else {
        samples.iter().map(|s| distance(first, s)).sum()
    };
    total / samples.len() as f64
}

/// First and last sample positions, `(0, 0)` pairs when empty
pub fn start_stop(samples: &[TouchSample]) -> ((f64, f64), (f64, f64)) {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => ((first.x, first.y), (last.x, last.y)),
        _ => ((0.0, 0.0), (0.0, 0.0)),
    }
}

fn endpoints(samples: &[TouchSample]) -> Option<(&TouchSample, &TouchSample)> {
    if samples.len() < 2 {
        return None;
    }
    Some((&samples[0], &samples[samples.len() - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn pts(coords: &[(f64, f64)]) -> Vec<TouchSample> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| TouchSample::at(x, y, i as i64 * 10))
            .collect()
    }

    #[test]
    fn test_short_inputs_are_zero() {
        let one = pts(&[(3.0, 4.0)]);
        assert_eq!(trajectory_length(&one), 0.0);
        assert_eq!(end_to_end_direction(&one), 0.0);
        assert_eq!(average_direction(&one), 0.0);
        assert_eq!(displacement(&one), (0.0, 0.0));
        assert_eq!(straightness_ratio(&one), 0.0);
        assert_eq!(curvature(&one), 0.0);
        assert_eq!(bounding_area(&[]), 0.0);
        assert_eq!(bounding_area(&one), 0.0);
    }

    #[test]
    fn test_trajectory_and_straightness() {
        let path = pts(&[(0.0, 0.0), (3.0, 4.0), (6.0, 0.0)]);
        assert_eq!(trajectory_length(&path), 10.0);
        assert_eq!(end_to_end_distance(&path), 6.0);
        assert!((straightness_ratio(&path) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_area() {
        let path = pts(&[(1.0, 1.0), (4.0, 2.0), (2.0, 6.0)]);
        assert_eq!(bounding_area(&path), 3.0 * 5.0);
    }

    #[test]
    fn test_directions() {
        let path = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert!((end_to_end_direction(&path) - FRAC_PI_4).abs() < 1e-12);
        assert!((average_direction(&path) - FRAC_PI_4).abs() < 1e-12);

        let up = pts(&[(0.0, 0.0), (0.0, 10.0)]);
        assert!((end_to_end_direction(&up) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_of_straight_line_is_zero() {
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert!(curvature(&line).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_of_arc() {
        // Middle sample sits 3 units above the chord; mean over 3 samples is 1
        let arc = pts(&[(0.0, 0.0), (5.0, 3.0), (10.0, 0.0)]);
        assert!((curvature(&arc) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_closed_loop_uses_start_distance() {
        let loop_ = pts(&[(0.0, 0.0), (3.0, 4.0), (0.0, 0.0)]);
        assert!((curvature(&loop_) - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_start_stop_and_displacement() {
        let path = pts(&[(2.0, 3.0), (5.0, 1.0), (7.0, -2.0)]);
        assert_eq!(start_stop(&path), ((2.0, 3.0), (7.0, -2.0)));
        assert_eq!(displacement(&path), (5.0, -5.0));
        assert_eq!(start_stop(&[]), ((0.0, 0.0), (0.0, 0.0)));
    }
}
