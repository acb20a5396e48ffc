//! Configuration management for trimesh-calibrate

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::{Point2D, Triangle, TrianglePair};
use crate::mesh::{TriangleMeshCalibrator, DEFAULT_AREA_EPSILON, DEFAULT_EDGE_TOLERANCE};

/// Solver tolerances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverConfig {
    /// Triangles with absolute signed area at or below this are degenerate
    #[serde(default = "default_area_epsilon")]
    pub area_epsilon: f64,

    /// Source edges whose A-B delta in x or y is at or below this fraction of
    /// the longest edge are rejected
    #[serde(default = "default_edge_tolerance")]
    pub edge_tolerance: f64,
}

fn default_area_epsilon() -> f64 {
    DEFAULT_AREA_EPSILON
}

fn default_edge_tolerance() -> f64 {
    DEFAULT_EDGE_TOLERANCE
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            area_epsilon: DEFAULT_AREA_EPSILON,
            edge_tolerance: DEFAULT_EDGE_TOLERANCE,
        }
    }
}

/// One calibration cell as written in the config file.
/// Vertex order is A, B, C for both triangles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PairConfig {
    pub source: [Point2D; 3],
    pub destination: [Point2D; 3],
}

impl PairConfig {
    pub fn to_pair(&self) -> TrianglePair {
        let [sa, sb, sc] = self.source;
        let [da, db, dc] = self.destination;
        TrianglePair::new(Triangle::new(sa, sb, sc), Triangle::new(da, db, dc))
    }
}

impl From<TrianglePair> for PairConfig {
    fn from(pair: TrianglePair) -> Self {
        Self {
            source: pair.source.vertices(),
            destination: pair.destination.vertices(),
        }
    }
}

/// Calibration mesh geometry, in lookup order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshConfig {
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        // Single cell, matching the classic one-triangle calibration demo
        Self {
            pairs: vec![PairConfig {
                source: [
                    Point2D::new(100.0, 100.0),
                    Point2D::new(200.0, 200.0),
                    Point2D::new(50.0, 200.0),
                ],
                destination: [
                    Point2D::new(300.0, 300.0),
                    Point2D::new(400.0, 400.0),
                    Point2D::new(250.0, 400.0),
                ],
            }],
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub mesh: MeshConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config = Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!(
                "Loaded configuration from {:?} ({} cells)",
                path,
                config.mesh.pairs.len()
            );
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate every cell and build a calibrator in config order
    pub fn build_calibrator(&self) -> Result<TriangleMeshCalibrator> {
        let calibrator = TriangleMeshCalibrator::from_pairs(
            self.mesh.pairs.iter().map(PairConfig::to_pair),
            self.solver.area_epsilon,
            self.solver.edge_tolerance,
        )
        .context("Invalid calibration mesh")?;
        Ok(calibrator)
    }

    /// Replace the mesh section with a calibrator's current cells
    pub fn store_calibrator(&mut self, calibrator: &TriangleMeshCalibrator) {
        self.mesh.pairs = calibrator.pairs().iter().copied().map(PairConfig::from).collect();
        self.solver.area_epsilon = calibrator.area_epsilon();
        self.solver.edge_tolerance = calibrator.edge_tolerance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalibrationError;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mesh.pairs.len(), 1);
        assert_eq!(config.solver.area_epsilon, DEFAULT_AREA_EPSILON);

        let cal = config.build_calibrator().unwrap();
        let p = cal.map(Point2D::new(100.0, 100.0)).point();
        assert_eq!(p, Some(Point2D::new(300.0, 300.0)));
    }

    #[test]
    fn test_parse_two_cell_mesh() {
        let content = r#"
            [solver]
            area_epsilon = 0.5

            [[mesh.pairs]]
            source = [{ x = 79.0, y = 9.0 }, { x = 258.0, y = 30.0 }, { x = 297.0, y = 207.0 }]
            destination = [{ x = 0.0, y = 0.0 }, { x = 640.0, y = 0.0 }, { x = 640.0, y = 480.0 }]

            [[mesh.pairs]]
            source = [{ x = 79.0, y = 9.0 }, { x = 78.0, y = 225.0 }, { x = 297.0, y = 207.0 }]
            destination = [{ x = 0.0, y = 0.0 }, { x = 0.0, y = 480.0 }, { x = 640.0, y = 480.0 }]
        "#;
        let config = Config::from_toml_str(content).unwrap();
        assert_eq!(config.solver.area_epsilon, 0.5);
        assert_eq!(config.mesh.pairs.len(), 2);

        let cal = config.build_calibrator().unwrap();
        assert_eq!(cal.len(), 2);
        assert_eq!(
            cal.map(Point2D::new(79.0, 9.0)).point(),
            Some(Point2D::new(0.0, 0.0))
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());

        let config = Config::from_toml_str("[mesh]\n").unwrap();
        assert!(config.mesh.pairs.is_empty());
        assert_eq!(config.solver.area_epsilon, DEFAULT_AREA_EPSILON);
    }

    #[test]
    fn test_invalid_cell_reports_index() {
        let mut config = Config::default();
        let destination = config.mesh.pairs[0].destination;
        config.mesh.pairs.push(PairConfig {
            source: [
                Point2D::new(0.0, 0.0),
                Point2D::new(1.0, 1.0),
                Point2D::new(2.0, 2.0),
            ],
            destination,
        });

        let err = config.build_calibrator().unwrap_err();
        match err.downcast_ref::<CalibrationError>() {
            Some(CalibrationError::InvalidPair { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nan_tolerance_rejected() {
        let config = Config::from_toml_str("[solver]\narea_epsilon = nan\n").unwrap();
        assert!(config.solver.area_epsilon.is_nan());

        let err = config.build_calibrator().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalibrationError>(),
            Some(CalibrationError::InvalidTolerance { name: "area_epsilon", .. })
        ));

        let config = Config::from_toml_str("[solver]\nedge_tolerance = -0.5\n").unwrap();
        assert!(config.build_calibrator().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!(
            "trimesh-calibrate-test-{}.toml",
            std::process::id()
        ));

        let mut cal = Config::default().build_calibrator().unwrap();
        cal.add_pair(
            PairConfig {
                source: [
                    Point2D::new(0.0, 0.0),
                    Point2D::new(10.0, 5.0),
                    Point2D::new(0.0, 10.0),
                ],
                destination: [
                    Point2D::new(0.0, 0.0),
                    Point2D::new(20.0, 10.0),
                    Point2D::new(0.0, 20.0),
                ],
            }
            .to_pair(),
        )
        .unwrap();

        let mut config = Config::default();
        config.store_calibrator(&cal);
        config.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
        assert_eq!(loaded.build_calibrator().unwrap().pairs(), cal.pairs());
    }
}
