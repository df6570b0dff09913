//! Stroke feature extraction
//!
//! Turns a completed stroke into the fixed-schema record the store and the
//! matcher consume. Field names on the wire are fixed; see [`FeatureRecord`].

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_VELOCITY_PERCENTILE;
use crate::stroke::kinematics::{
    acceleration_series, angle_change_rate, average_acceleration, average_deceleration,
    average_velocity, max_idle_time, max_velocity, min_velocity, percentile_velocity,
    velocity_series, velocity_variance,
};
use crate::stroke::position::{
    average_direction, bounding_area, curvature, displacement, end_to_end_direction, start_stop,
    straightness_ratio, trajectory_length,
};
use crate::stroke::pressure::{
    average_contact_area, initial_pressure, max_pressure, mid_stroke_pressure, min_pressure,
    pressure_change_rate, pressure_variance, total_contact_size,
};
use crate::stroke::types::Stroke;

/// Feature vector for one stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    #[serde(rename = "userID")]
    pub user_id: i64,
    /// Touch-down to touch-up, milliseconds
    pub stroke_duration: i64,
    pub mid_stroke_area: f64,
    pub mid_stroke_press: f64,
    pub dir_end_to_end: f64,
    pub ave_dir: f64,
    pub ave_velo: f64,
    pub pairwise_velo_percent: f64,
    pub start_x: f64,
    pub start_y: f64,
    pub stop_x: f64,
    pub stop_y: f64,
    pub touch_area: f64,
    pub max_velo: f64,
    pub min_velo: f64,
    pub accel: f64,
    pub decel: f64,
    pub traj_length: f64,
    pub curvature: f64,
    pub velo_variance: f64,
    pub angle_change_rate: f64,
    pub max_press: f64,
    pub min_press: f64,
    pub init_press: f64,
    pub press_change_rate: f64,
    pub press_variance: f64,
    /// Milliseconds
    pub max_idle_time: i64,
    pub straightness_ratio: f64,
    pub x_displacement: f64,
    pub y_displacement: f64,
    pub ave_touch_area: f64,
}

impl FeatureRecord {
    /// Flat JSON object with the wire field names
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Feature extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureExtractor {
    velocity_percentile: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_VELOCITY_PERCENTILE)
    }
}

impl FeatureExtractor {
    /// Create an extractor reporting the given percentile (0-100) of pairwise velocity
    pub fn new(velocity_percentile: f64) -> Self {
        Self {
            velocity_percentile,
        }
    }

    pub fn velocity_percentile(&self) -> f64 {
        self.velocity_percentile
    }

    /// Compute the feature record for a stroke.
    ///
    /// Never fails: every metric degrades to 0 when the stroke is too short to
    /// define it.
    pub fn extract(&self, user_id: i64, stroke: &Stroke) -> FeatureRecord {
        let samples = stroke.samples();

        let series = velocity_series(samples);
        let accelerations = acceleration_series(&series);
        let ((start_x, start_y), (stop_x, stop_y)) = start_stop(samples);
        let (x_displacement, y_displacement) = displacement(samples);

        FeatureRecord {
            user_id,
            stroke_duration: stroke.duration_ms().max(0),
            mid_stroke_area: bounding_area(samples),
            mid_stroke_press: mid_stroke_pressure(samples),
            dir_end_to_end: end_to_end_direction(samples),
            ave_dir: average_direction(samples),
            ave_velo: average_velocity(samples, stroke.duration_ms()),
            pairwise_velo_percent: percentile_velocity(&series, self.velocity_percentile),
            start_x,
            start_y,
            stop_x,
            stop_y,
            touch_area: total_contact_size(samples),
            max_velo: max_velocity(&series),
            min_velo: min_velocity(&series),
            accel: average_acceleration(&accelerations),
            decel: average_deceleration(&accelerations),
            traj_length: trajectory_length(samples),
            curvature: curvature(samples),
            velo_variance: velocity_variance(&series),
            angle_change_rate: angle_change_rate(samples),
            max_press: max_pressure(samples),
            min_press: min_pressure(samples),
            init_press: initial_pressure(samples),
            press_change_rate: pressure_change_rate(samples),
            press_variance: pressure_variance(samples),
            max_idle_time: max_idle_time(samples),
            straightness_ratio: straightness_ratio(samples),
            x_displacement,
            y_displacement,
            ave_touch_area: average_contact_area(samples),
        }
    }
}
