//! Piecewise-affine calibration over an ordered triangle mesh
//!
//! A [`TriangleMeshCalibrator`] owns an ordered list of calibration cells
//! (source/destination triangle pairs). A query point is mapped through the
//! first cell, in insertion order, whose source triangle contains it.
//! Overlapping cells are legal and resolved purely by that order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::barycentric::{self, BarycentricWeights};
use crate::error::{CalibrationError, TriangleRole};
use crate::geometry::{Point2D, TrianglePair};

/// Default tolerance on a triangle's absolute signed area
pub const DEFAULT_AREA_EPSILON: f64 = 1e-9;

/// Default bound on `|B.x - A.x|` and `|B.y - A.y|`, relative to the longest edge
pub const DEFAULT_EDGE_TOLERANCE: f64 = 1e-9;

/// Ordered sequence of calibration cells
pub type CalibrationMesh = Vec<TrianglePair>;

/// Outcome of a single mapping query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MappingResult {
    /// The query fell inside cell `cell`
    Mapped {
        point: Point2D,
        weights: BarycentricWeights,
        cell: usize,
        #[serde(skip)]
        pair: TrianglePair,
    },
    /// No cell contains the query
    NotFound,
}

impl MappingResult {
    pub fn point(&self) -> Option<Point2D> {
        match self {
            Self::Mapped { point, .. } => Some(*point),
            Self::NotFound => None,
        }
    }

    pub fn cell(&self) -> Option<usize> {
        match self {
            Self::Mapped { cell, .. } => Some(*cell),
            Self::NotFound => None,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }
}

/// Maps points from source space to destination space through a triangle mesh
#[derive(Debug, Clone)]
pub struct TriangleMeshCalibrator {
    mesh: CalibrationMesh,
    /// Triangles with absolute signed area at or below this are rejected
    area_epsilon: f64,
    /// Relative bound on the source A-B edge deltas the solver divides by
    edge_tolerance: f64,
}

impl Default for TriangleMeshCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_tolerance(name: &'static str, value: f64) -> Result<f64, CalibrationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CalibrationError::InvalidTolerance { name, value })
    }
}

impl TriangleMeshCalibrator {
    pub fn new() -> Self {
        Self {
            mesh: Vec::new(),
            area_epsilon: DEFAULT_AREA_EPSILON,
            edge_tolerance: DEFAULT_EDGE_TOLERANCE,
        }
    }

    pub fn with_epsilon(area_epsilon: f64) -> Result<Self, CalibrationError> {
        Self::with_tolerances(area_epsilon, DEFAULT_EDGE_TOLERANCE)
    }

    /// Both tolerances must be finite and non-negative
    pub fn with_tolerances(area_epsilon: f64, edge_tolerance: f64) -> Result<Self, CalibrationError> {
        Ok(Self {
            mesh: Vec::new(),
            area_epsilon: check_tolerance("area_epsilon", area_epsilon)?,
            edge_tolerance: check_tolerance("edge_tolerance", edge_tolerance)?,
        })
    }

    /// Build a calibrator from a list of pairs, failing on the first invalid one
    pub fn from_pairs<I>(
        pairs: I,
        area_epsilon: f64,
        edge_tolerance: f64,
    ) -> Result<Self, CalibrationError>
    where
        I: IntoIterator<Item = TrianglePair>,
    {
        let mut calibrator = Self::with_tolerances(area_epsilon, edge_tolerance)?;
        for pair in pairs {
            calibrator.add_pair(pair)?;
        }
        Ok(calibrator)
    }

    pub fn area_epsilon(&self) -> f64 {
        self.area_epsilon
    }

    pub fn edge_tolerance(&self) -> f64 {
        self.edge_tolerance
    }

    pub fn pairs(&self) -> &[TrianglePair] {
        &self.mesh
    }

    pub fn len(&self) -> usize {
        self.mesh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    /// Validate a pair against this calibrator's tolerance without inserting it
    pub fn validate_pair(&self, pair: &TrianglePair, index: usize) -> Result<(), CalibrationError> {
        let invalid = |role, reason| CalibrationError::InvalidPair {
            index,
            role,
            reason,
        };

        pair.source
            .check_area(self.area_epsilon)
            .and_then(|()| barycentric::check_solvable(&pair.source, self.edge_tolerance))
            .map_err(|reason| invalid(TriangleRole::Source, reason))?;

        // The destination is only interpolated, never solved against
        pair.destination
            .check_area(self.area_epsilon)
            .map_err(|reason| invalid(TriangleRole::Destination, reason))?;

        Ok(())
    }

    /// Append a calibration cell, returning its index
    pub fn add_pair(&mut self, pair: TrianglePair) -> Result<usize, CalibrationError> {
        let index = self.mesh.len();
        if let Err(e) = self.validate_pair(&pair, index) {
            warn!("Rejected calibration cell: {}", e);
            return Err(e);
        }
        self.mesh.push(pair);
        debug!("Added calibration cell {} ({} total)", index, self.mesh.len());
        Ok(index)
    }

    /// Remove the cell at `index`; later cells shift down by one
    pub fn remove_pair(&mut self, index: usize) -> Option<TrianglePair> {
        if index >= self.mesh.len() {
            return None;
        }
        let pair = self.mesh.remove(index);
        debug!("Removed calibration cell {} ({} left)", index, self.mesh.len());
        Some(pair)
    }

    pub fn clear(&mut self) {
        self.mesh.clear();
    }

    /// Map a point through the first cell that contains it
    pub fn map(&self, query: Point2D) -> MappingResult {
        for (cell, pair) in self.mesh.iter().enumerate() {
            // Validated cells only fail to solve when the query overflows
            let Ok((weights, point)) = barycentric::solve(&pair.source, &pair.destination, query)
            else {
                continue;
            };
            if weights.contains() {
                return MappingResult::Mapped {
                    point,
                    weights,
                    cell,
                    pair: *pair,
                };
            }
        }
        MappingResult::NotFound
    }

    /// Map a point, falling back to the nearest cell when no cell contains it.
    ///
    /// The nearest cell is the one whose source triangle is closest to `query`
    /// in Euclidean distance (the earliest wins ties). The query is moved to
    /// the closest point of that triangle's boundary and mapped from there.
    /// Returns `None` when the mesh is empty or no cell can be solved.
    pub fn map_or_nearest(&self, query: Point2D) -> Option<Point2D> {
        if let MappingResult::Mapped { point, .. } = self.map(query) {
            return Some(point);
        }

        let mut best: Option<(f64, Point2D)> = None;
        for pair in &self.mesh {
            let closest = pair.source.closest_point(query);
            let distance = query.distance_to(closest);
            if best.map_or(false, |(d, _)| distance >= d) || distance.is_nan() {
                continue;
            }
            // Weights on the boundary may come out a rounding error below zero
            let Ok((_, point)) = barycentric::solve(&pair.source, &pair.destination, closest)
            else {
                continue;
            };
            best = Some((distance, point));
        }

        best.map(|(_, point)| point)
    }

    /// Map a batch of points in parallel; results keep the input order
    pub fn map_all(&self, queries: &[Point2D]) -> Vec<MappingResult> {
        queries.par_iter().map(|&q| self.map(q)).collect()
    }
}
