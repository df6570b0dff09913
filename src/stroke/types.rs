//! Touch sample and stroke types
//!
//! A stroke is one continuous gesture from touch-down to touch-up, kept as the
//! chronological list of samples the host reported for it.

use serde::{Deserialize, Serialize};

/// One instantaneous touch reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    /// Milliseconds on the host's monotonic clock
    pub timestamp: i64,
    #[serde(default)]
    pub pressure: f64,
    /// Normalized contact size as reported by the digitizer
    #[serde(default)]
    pub contact_size: f64,
    /// Major axis of the contact ellipse
    #[serde(default)]
    pub contact_major: f64,
    /// Minor axis of the contact ellipse
    #[serde(default)]
    pub contact_minor: f64,
}

impl TouchSample {
    /// Build a sample, replacing non-finite coordinates with 0 and clamping
    /// pressure and contact measurements to be non-negative.
    pub fn new(
        x: f64,
        y: f64,
        timestamp: i64,
        pressure: f64,
        contact_size: f64,
        contact_major: f64,
        contact_minor: f64,
    ) -> Self {
        Self {
            x: finite_or_zero(x),
            y: finite_or_zero(y),
            timestamp,
            pressure: non_negative(pressure),
            contact_size: non_negative(contact_size),
            contact_major: non_negative(contact_major),
            contact_minor: non_negative(contact_minor),
        }
    }

    /// Position and time only; pressure and contact default to zero
    pub fn at(x: f64, y: f64, timestamp: i64) -> Self {
        Self::new(x, y, timestamp, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = non_negative(pressure);
        self
    }

    pub fn with_contact(mut self, size: f64, major: f64, minor: f64) -> Self {
        self.contact_size = non_negative(size);
        self.contact_major = non_negative(major);
        self.contact_minor = non_negative(minor);
        self
    }

    /// Re-apply the constructor's sanitizing rules (used for deserialized input)
    pub fn sanitized(self) -> Self {
        Self::new(
            self.x,
            self.y,
            self.timestamp,
            self.pressure,
            self.contact_size,
            self.contact_major,
            self.contact_minor,
        )
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// `to - from` in milliseconds, or 0 when the difference overflows `i64`
pub fn elapsed_ms(from: i64, to: i64) -> i64 {
    to.checked_sub(from).unwrap_or(0)
}

/// A time-ordered sequence of samples from touch-down to touch-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub start_time: i64,
    pub end_time: i64,
    samples: Vec<TouchSample>,
    #[serde(default)]
    sealed: bool,
}

impl Stroke {
    /// Start a stroke from its touch-down sample
    pub fn begin(first: TouchSample) -> Self {
        Self {
            start_time: first.timestamp,
            end_time: first.timestamp,
            samples: vec![first],
            sealed: false,
        }
    }

    /// Build a sealed stroke from already collected samples.
    ///
    /// Used by offline extraction; the end time is the last sample's timestamp.
    pub fn from_samples(samples: Vec<TouchSample>) -> Self {
        let start_time = samples.first().map(|s| s.timestamp).unwrap_or(0);
        let mut stroke = Self {
            start_time,
            end_time: start_time,
            samples,
            sealed: false,
        };
        let end = stroke.samples.last().map(|s| s.timestamp).unwrap_or(start_time);
        stroke.seal(end);
        stroke
    }

    /// Append a touch-move sample. Samples arriving after `seal` are ignored.
    pub fn append(&mut self, sample: TouchSample) {
        if self.sealed {
            return;
        }
        self.samples.push(sample);
    }

    /// Finalize the stroke on touch-up. `end_time` never precedes
    /// `start_time` or the last sample.
    pub fn seal(&mut self, end_time: i64) {
        let last = self.samples.last().map(|s| s.timestamp).unwrap_or(self.start_time);
        self.end_time = end_time.max(last).max(self.start_time);
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn samples(&self) -> &[TouchSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Touch-down to touch-up, in milliseconds
    pub fn duration_ms(&self) -> i64 {
        elapsed_ms(self.start_time, self.end_time)
    }
}

/// Raw touch event forwarded by the host UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TouchEvent {
    Down(TouchSample),
    Move(TouchSample),
    Up { timestamp: i64 },
}

impl TouchEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            TouchEvent::Down(s) | TouchEvent::Move(s) => s.timestamp,
            TouchEvent::Up { timestamp } => *timestamp,
        }
    }
}

/// Builds strokes from a raw down/move/up event stream.
///
/// A down while a stroke is open drops the open stroke. A move with no open
/// stroke starts one. An up with no open stroke yields nothing.
#[derive(Debug, Clone, Default)]
pub struct StrokeAssembler {
    current: Option<Stroke>,
}

impl StrokeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new stroke. Returns the unfinished stroke this replaced, if any.
    pub fn down(&mut self, sample: TouchSample) -> Option<Stroke> {
        self.current.replace(Stroke::begin(sample.sanitized()))
    }

    pub fn move_to(&mut self, sample: TouchSample) {
        let sample = sample.sanitized();
        match self.current.as_mut() {
            Some(stroke) => stroke.append(sample),
            None => self.current = Some(Stroke::begin(sample)),
        }
    }

    /// Seal and hand back the open stroke
    pub fn up(&mut self, timestamp: i64) -> Option<Stroke> {
        let mut stroke = self.current.take()?;
        stroke.seal(timestamp);
        Some(stroke)
    }

    /// Feed one event; returns the completed stroke on touch-up
    pub fn push(&mut self, event: TouchEvent) -> Option<Stroke> {
        match event {
            TouchEvent::Down(sample) => {
                self.down(sample);
                None
            }
            TouchEvent::Move(sample) => {
                self.move_to(sample);
                None
            }
            TouchEvent::Up { timestamp } => self.up(timestamp),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.current.is_some()
    }

    /// Drop any open stroke
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_sanitizing() {
        let s = TouchSample::new(f64::NAN, 4.0, 10, -0.3, f64::INFINITY, 2.0, -1.0);
        assert_eq!(s.x, 0.0);
        assert_eq!(s.y, 4.0);
        assert_eq!(s.pressure, 0.0);
        assert_eq!(s.contact_size, 0.0);
        assert_eq!(s.contact_major, 2.0);
        assert_eq!(s.contact_minor, 0.0);
    }

    #[test]
    fn test_seal_never_precedes_samples() {
        let mut stroke = Stroke::begin(TouchSample::at(0.0, 0.0, 100));
        stroke.append(TouchSample::at(1.0, 1.0, 150));
        stroke.seal(120);
        assert_eq!(stroke.end_time, 150);
        assert_eq!(stroke.duration_ms(), 50);
        assert!(stroke.is_sealed());
    }

    #[test]
    fn test_append_after_seal_is_ignored() {
        let mut stroke = Stroke::begin(TouchSample::at(0.0, 0.0, 0));
        stroke.seal(10);
        stroke.append(TouchSample::at(5.0, 5.0, 20));
        assert_eq!(stroke.len(), 1);
    }

    #[test]
    fn test_from_samples_empty() {
        let stroke = Stroke::from_samples(vec![]);
        assert!(stroke.is_empty());
        assert_eq!(stroke.duration_ms(), 0);
    }

    #[test]
    fn test_touch_event_json_shape() {
        let json = r#"{"action":"down","x":1.0,"y":2.0,"timestamp":5,"pressure":0.4}"#;
        let event: TouchEvent = serde_json::from_str(json).unwrap();
        match event {
            TouchEvent::Down(s) => {
                assert_eq!(s.timestamp, 5);
                assert_eq!(s.pressure, 0.4);
                assert_eq!(s.contact_size, 0.0);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let up: TouchEvent = serde_json::from_str(r#"{"action":"up","timestamp":9}"#).unwrap();
        assert_eq!(up.timestamp(), 9);
    }

    #[test]
    fn test_assembler_builds_stroke_from_events() {
        let mut assembler = StrokeAssembler::new();
        assert!(assembler.push(TouchEvent::Down(TouchSample::at(0.0, 0.0, 0))).is_none());
        assert!(assembler.push(TouchEvent::Move(TouchSample::at(3.0, 4.0, 10))).is_none());
        assert!(assembler.in_progress());

        let stroke = assembler.push(TouchEvent::Up { timestamp: 30 }).unwrap();
        assert_eq!(stroke.len(), 2);
        assert_eq!(stroke.duration_ms(), 30);
        assert!(stroke.is_sealed());
        assert!(!assembler.in_progress());
        assert!(assembler.push(TouchEvent::Up { timestamp: 40 }).is_none());
    }

    #[test]
    fn test_assembler_down_replaces_open_stroke() {
        let mut assembler = StrokeAssembler::new();
        assert!(assembler.down(TouchSample::at(0.0, 0.0, 0)).is_none());
        assembler.move_to(TouchSample::at(1.0, 1.0, 5));
        let dropped = assembler.down(TouchSample::at(9.0, 9.0, 50)).unwrap();
        assert_eq!(dropped.len(), 2);

        let stroke = assembler.up(60).unwrap();
        assert_eq!(stroke.len(), 1);
        assert_eq!(stroke.start_time, 50);
    }

    #[test]
    fn test_assembler_move_without_down_starts_stroke() {
        let mut assembler = StrokeAssembler::new();
        assembler.move_to(TouchSample::at(f64::NAN, 2.0, 7));
        let stroke = assembler.up(9).unwrap();
        assert_eq!(stroke.samples()[0].x, 0.0);
        assert_eq!(stroke.start_time, 7);

        assembler.down(TouchSample::at(0.0, 0.0, 0));
        assembler.clear();
        assert!(assembler.up(1).is_none());
    }
}
