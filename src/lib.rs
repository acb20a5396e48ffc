//! trimesh-calibrate - piecewise-affine point calibration
//!
//! Maps points from a source coordinate space (raw input or sensor
//! coordinates) into a destination space (e.g. a calibrated display) using an
//! ordered mesh of matching source/destination triangles. Inside each
//! triangle the mapping is affine, defined by the point's barycentric weights.

pub mod barycentric;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod shared;

pub use barycentric::{solve, BarycentricWeights};
pub use config::Config;
pub use error::{CalibrationError, DegenerateReason, TriangleRole};
pub use geometry::{Point2D, Triangle, TrianglePair};
pub use mesh::{CalibrationMesh, MappingResult, TriangleMeshCalibrator};
pub use shared::SharedCalibrator;
