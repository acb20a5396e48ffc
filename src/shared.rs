//! Shared calibration state for live updates
//!
//! Readers (e.g. a render or capture loop) map points against an immutable
//! snapshot of the mesh. Writers edit a private copy and publish it in one
//! atomic swap, so a query never observes a half-edited mesh.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::CalibrationError;
use crate::geometry::Point2D;
use crate::mesh::{MappingResult, TriangleMeshCalibrator};

pub struct SharedCalibrator {
    current: ArcSwap<TriangleMeshCalibrator>,
    /// Serialises writers so concurrent updates cannot lose each other's edits
    write_lock: Mutex<()>,
}

impl SharedCalibrator {
    pub fn new(calibrator: TriangleMeshCalibrator) -> Self {
        Self {
            current: ArcSwap::from_pointee(calibrator),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the current mesh snapshot
    pub fn snapshot(&self) -> Arc<TriangleMeshCalibrator> {
        self.current.load_full()
    }

    pub fn map(&self, query: Point2D) -> MappingResult {
        self.current.load().map(query)
    }

    pub fn map_or_nearest(&self, query: Point2D) -> Option<Point2D> {
        self.current.load().map_or_nearest(query)
    }

    /// Edit a copy of the mesh and publish it if `f` succeeds.
    ///
    /// On error the published mesh is left untouched.
    pub fn update<R, F>(&self, f: F) -> Result<R, CalibrationError>
    where
        F: FnOnce(&mut TriangleMeshCalibrator) -> Result<R, CalibrationError>,
    {
        let _guard = self.write_lock.lock();
        let mut next = TriangleMeshCalibrator::clone(&self.current.load());
        let out = f(&mut next)?;
        let cells = next.len();
        self.current.store(Arc::new(next));
        tracing::info!("Published calibration mesh with {} cells", cells);
        Ok(out)
    }

    /// Replace the whole mesh
    pub fn replace(&self, calibrator: TriangleMeshCalibrator) {
        let _guard = self.write_lock.lock();
        self.current.store(Arc::new(calibrator));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Triangle, TrianglePair};
    use std::thread;

    fn pair(offset: f64) -> TrianglePair {
        let t = |o: f64| {
            Triangle::new(
                Point2D::new(100.0 + o, 100.0),
                Point2D::new(200.0 + o, 200.0),
                Point2D::new(50.0 + o, 200.0),
            )
        };
        TrianglePair::new(t(offset), t(offset + 200.0))
    }

    #[test]
    fn test_update_publishes() {
        let shared = SharedCalibrator::new(TriangleMeshCalibrator::new());
        let before = shared.snapshot();

        let index = shared.update(|cal| cal.add_pair(pair(0.0))).unwrap();
        assert_eq!(index, 0);

        // Old snapshots are unaffected
        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 1);
        assert!(shared.map(Point2D::new(100.0, 100.0)).is_mapped());
    }

    #[test]
    fn test_failed_update_keeps_mesh() {
        let shared = SharedCalibrator::new(TriangleMeshCalibrator::new());
        shared.update(|cal| cal.add_pair(pair(0.0))).unwrap();

        let collinear = Triangle::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        );
        let result = shared.update(|cal| {
            cal.add_pair(pair(1000.0))?;
            cal.add_pair(TrianglePair::new(collinear, collinear))
        });

        assert!(result.is_err());
        // The first add inside the failed update is not visible either
        assert_eq!(shared.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_meshes() {
        let shared = Arc::new(SharedCalibrator::new(TriangleMeshCalibrator::new()));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = shared.snapshot();
                        // Cells are always added two at a time
                        assert_eq!(snap.len() % 2, 0);
                    }
                })
            })
            .collect();

        for i in 0..20 {
            shared
                .update(|cal| {
                    cal.add_pair(pair(i as f64 * 300.0))?;
                    cal.add_pair(pair(i as f64 * 300.0 + 10.0))
                })
                .unwrap();
        }

        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(shared.snapshot().len(), 40);
    }
}
