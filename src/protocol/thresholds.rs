//! Ultrasonic distance thresholds
//!
//! Sent to the ultrasonic peripheral as `THRESHOLDS:<front>:<overhead>`, both
//! values in centimeters.

use std::fmt;

use crate::error::ProtocolError;
use crate::protocol::constants::{TAG_SEPARATOR, TAG_THRESHOLDS};

/// Largest distance the ranging unit is configured for, in cm
pub const MAX_THRESHOLD_CM: f32 = 500.0;

/// Front and overhead obstacle thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Front distance threshold in cm
    pub front_cm: f32,
    /// Overhead distance threshold in cm
    pub overhead_cm: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            front_cm: 100.0,
            overhead_cm: 50.0,
        }
    }
}

impl Thresholds {
    /// Create thresholds, clamping both values into `0..=500` cm
    pub fn new(front_cm: f32, overhead_cm: f32) -> Self {
        Self {
            front_cm: clamp_cm(front_cm),
            overhead_cm: clamp_cm(overhead_cm),
        }
    }

    /// Parse the `<front>:<overhead>` payload of a `THRESHOLDS` line
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedThresholds(payload.to_string());

        let (front, overhead) = payload.trim().split_once(TAG_SEPARATOR).ok_or_else(malformed)?;
        let front: f32 = front.trim().parse().map_err(|_| malformed())?;
        let overhead: f32 = overhead.trim().parse().map_err(|_| malformed())?;

        if !in_range(front) || !in_range(overhead) {
            return Err(malformed());
        }

        Ok(Self {
            front_cm: front,
            overhead_cm: overhead,
        })
    }

    /// Render the full command line (without terminator)
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TAG_THRESHOLDS}{TAG_SEPARATOR}{:.1}{TAG_SEPARATOR}{:.1}",
            self.front_cm, self.overhead_cm
        )
    }
}

fn in_range(cm: f32) -> bool {
    (0.0..=MAX_THRESHOLD_CM).contains(&cm)
}

fn clamp_cm(cm: f32) -> f32 {
    if cm.is_nan() {
        0.0
    } else {
        cm.clamp(0.0, MAX_THRESHOLD_CM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = Thresholds::default();
        assert_eq!(t.front_cm, 100.0);
        assert_eq!(t.overhead_cm, 50.0);
        assert_eq!(t.to_line(), "THRESHOLDS:100.0:50.0");
    }

    #[test]
    fn test_new_clamps() {
        let t = Thresholds::new(900.0, -3.0);
        assert_eq!(t.front_cm, 500.0);
        assert_eq!(t.overhead_cm, 0.0);

        let t = Thresholds::new(f32::NAN, 20.0);
        assert_eq!(t.front_cm, 0.0);
    }

    #[test]
    fn test_parse() {
        let t = Thresholds::parse("120.5:40").unwrap();
        assert_eq!(t.front_cm, 120.5);
        assert_eq!(t.overhead_cm, 40.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Thresholds::parse("120").is_err());
        assert!(Thresholds::parse("abc:10").is_err());
        assert!(Thresholds::parse("10:600").is_err());
    }
}
