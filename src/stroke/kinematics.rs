//! Time-and-position stroke metrics
//!
//! Velocity-based metrics only use consecutive sample pairs whose time delta is
//! positive. Pairs with a zero or negative delta (duplicate or out-of-order
//! timestamps) are skipped rather than producing infinities.

use std::f64::consts::PI;

use crate::stroke::position::{distance, trajectory_length};
use crate::stroke::pressure::variance;
use crate::stroke::types::{elapsed_ms, TouchSample};

/// Velocity of one consecutive sample pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Spatial units per millisecond
    pub velocity: f64,
    /// Time delta of the pair in milliseconds, always > 0
    pub dt: f64,
}

/// Velocity series over all pairs with a positive time delta
pub fn velocity_series(samples: &[TouchSample]) -> Vec<Segment> {
    samples
        .windows(2)
        .filter_map(|w| {
            let dt = elapsed_ms(w[0].timestamp, w[1].timestamp);
            if dt <= 0 {
                return None;
            }
            let dt = dt as f64;
            Some(Segment {
                velocity: distance(&w[0], &w[1]) / dt,
                dt,
            })
        })
        .collect()
}

/// Last sample timestamp minus first, clamped at zero
pub fn sample_span_ms(samples: &[TouchSample]) -> i64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => elapsed_ms(first.timestamp, last.timestamp).max(0),
        _ => 0,
    }
}

/// Path length over the whole stroke duration, touch-down to touch-up
pub fn average_velocity(samples: &[TouchSample], duration_ms: i64) -> f64 {
    if samples.len() < 2 || duration_ms <= 0 {
        return 0.0;
    }
    trajectory_length(samples) / duration_ms as f64
}

pub fn max_velocity(series: &[Segment]) -> f64 {
    series
        .iter()
        .map(|s| s.velocity)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0)
}

pub fn min_velocity(series: &[Segment]) -> f64 {
    series
        .iter()
        .map(|s| s.velocity)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
        .unwrap_or(0.0)
}

/// Nearest-rank percentile of the velocity series.
///
/// Index is `round((n - 1) * p / 100)` into the ascending series; no
/// interpolation between neighbours.
pub fn percentile_velocity(series: &[Segment], percentile: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let p = if percentile.is_finite() {
        percentile.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let mut sorted: Vec<f64> = series.iter().map(|s| s.velocity).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = (((sorted.len() - 1) as f64) * p / 100.0).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Population variance of the velocity series; needs at least two segments
pub fn velocity_variance(series: &[Segment]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    variance(series.iter().map(|s| s.velocity))
}

/// Acceleration between consecutive segments, `(v_i - v_{i-1}) / dt_i`
pub fn acceleration_series(series: &[Segment]) -> Vec<f64> {
    series
        .windows(2)
        .map(|w| (w[1].velocity - w[0].velocity) / w[1].dt)
        .collect()
}

/// Mean of the positive accelerations
pub fn average_acceleration(accelerations: &[f64]) -> f64 {
    mean_where(accelerations, |a| a > 0.0)
}

/// Mean of the negative accelerations (a value ≤ 0)
pub fn average_deceleration(accelerations: &[f64]) -> f64 {
    mean_where(accelerations, |a| a < 0.0)
}

fn mean_where(values: &[f64], keep: impl Fn(f64) -> bool) -> f64 {
    let (count, sum) = values
        .iter()
        .copied()
        .filter(|&v| keep(v))
        .fold((0usize, 0.0), |(c, s), v| (c + 1, s + v));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Total absolute heading change per millisecond.
///
/// Headings come from consecutive pairs that actually moved; each change is
/// wrapped into `[-π, π]` before taking its magnitude.
pub fn angle_change_rate(samples: &[TouchSample]) -> f64 {
    let headings: Vec<f64> = samples
        .windows(2)
        .filter(|w| distance(&w[0], &w[1]) > 0.0)
        .map(|w| (w[1].y - w[0].y).atan2(w[1].x - w[0].x))
        .collect();
    if headings.len() < 2 {
        return 0.0;
    }
    let span = sample_span_ms(samples);
    if span == 0 {
        return 0.0;
    }
    let turned: f64 = headings
        .windows(2)
        .map(|h| wrap_angle(h[1] - h[0]).abs())
        .sum();
    turned / span as f64
}

fn wrap_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Longest pause between consecutive samples, in milliseconds
pub fn max_idle_time(samples: &[TouchSample]) -> i64 {
    samples
        .windows(2)
        .map(|w| elapsed_ms(w[0].timestamp, w[1].timestamp).max(0))
        .max()
        .unwrap_or(0)
}
