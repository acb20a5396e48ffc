//! Error types for calibration mesh construction and solving

use std::fmt;
use thiserror::Error;

/// Why a triangle cannot be used for barycentric solving
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DegenerateReason {
    /// Vertices are collinear (or nearly so); `area` is the signed area found
    Collinear { area: f64 },
    /// A vertex coordinate is NaN or infinite
    NonFinite,
    /// `B.x - A.x` is zero, or negligible next to the triangle's size
    VerticalBaseEdge,
    /// `B.y - A.y` is zero, or negligible next to the triangle's size
    HorizontalBaseEdge,
    /// The denominator of the `c` weight evaluates to zero
    SingularSystem,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collinear { area } => write!(f, "vertices are collinear (signed area {area})"),
            Self::NonFinite => write!(f, "vertex coordinates are not finite"),
            Self::VerticalBaseEdge => write!(f, "edge A-B is vertical"),
            Self::HorizontalBaseEdge => write!(f, "edge A-B is horizontal"),
            Self::SingularSystem => write!(f, "weight system is singular"),
        }
    }
}

/// Which triangle of a calibration cell failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleRole {
    Source,
    Destination,
}

impl fmt::Display for TriangleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Errors raised by the calibration core
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// A triangle cannot be solved against.
    #[error("degenerate triangle: {reason}")]
    DegenerateTriangle { reason: DegenerateReason },

    /// A pair was rejected while being added to a mesh.
    #[error("calibration cell {index}: degenerate {role} triangle: {reason}")]
    InvalidPair {
        index: usize,
        role: TriangleRole,
        reason: DegenerateReason,
    },

    /// A solver tolerance is negative, NaN or infinite.
    #[error("invalid {name}: {value} (must be finite and non-negative)")]
    InvalidTolerance { name: &'static str, value: f64 },
}

impl CalibrationError {
    /// True for every failure caused by a degenerate triangle
    pub fn is_degenerate(&self) -> bool {
        self.reason().is_some()
    }

    pub fn reason(&self) -> Option<DegenerateReason> {
        match self {
            Self::DegenerateTriangle { reason } | Self::InvalidPair { reason, .. } => Some(*reason),
            Self::InvalidTolerance { .. } => None,
        }
    }
}

impl From<DegenerateReason> for CalibrationError {
    fn from(reason: DegenerateReason) -> Self {
        Self::DegenerateTriangle { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CalibrationError::from(DegenerateReason::VerticalBaseEdge);
        assert_eq!(err.to_string(), "degenerate triangle: edge A-B is vertical");

        let err = CalibrationError::InvalidPair {
            index: 2,
            role: TriangleRole::Destination,
            reason: DegenerateReason::NonFinite,
        };
        assert_eq!(
            err.to_string(),
            "calibration cell 2: degenerate destination triangle: vertex coordinates are not finite"
        );
        assert!(err.is_degenerate());
        assert_eq!(err.reason(), Some(DegenerateReason::NonFinite));
    }

    #[test]
    fn test_invalid_tolerance_is_not_degenerate() {
        let err = CalibrationError::InvalidTolerance {
            name: "area_epsilon",
            value: -1.0,
        };
        assert!(!err.is_degenerate());
        assert_eq!(err.reason(), None);
        assert_eq!(
            err.to_string(),
            "invalid area_epsilon: -1 (must be finite and non-negative)"
        );
    }
}
