//! Per-model pose buffers reused across refinements.

use crate::kernel::PoseOffsets;
use crate::model::EdgePoint;
use crate::util::math::sin_cos_deg;
use crate::util::{ShapeMatchError, ShapeMatchResult};

/// Bounding box of a pose's integer offsets relative to its center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoseExtent {
    pub min_dx: isize,
    pub max_dx: isize,
    pub min_dy: isize,
    pub max_dy: isize,
}

impl PoseExtent {
    /// Whether a center at `(x, y)` keeps every offset inside a
    /// `width x height` field.
    pub fn fits(&self, x: isize, y: isize, width: usize, height: usize) -> bool {
        x + self.min_dx >= 0
            && y + self.min_dy >= 0
            && x + self.max_dx < width as isize
            && y + self.max_dy < height as isize
    }
}

/// Flat buffers holding rotated and scaled model points for a pose lattice.
///
/// Slot `k` owns `point_stride` entries starting at `k * point_stride`. The
/// arena only grows through [`PoseArena::ensure_capacity`]; growing discards
/// previously written poses.
#[derive(Clone, Debug, Default)]
pub struct PoseArena {
    offsets: Vec<isize>,
    dir_x: Vec<f32>,
    dir_y: Vec<f32>,
    extents: Vec<PoseExtent>,
    lens: Vec<usize>,
    point_stride: usize,
    pose_capacity: usize,
}

impl PoseArena {
    /// Makes room for `poses` slots of `points` entries each.
    pub fn ensure_capacity(&mut self, poses: usize, points: usize) {
        if poses <= self.pose_capacity && points <= self.point_stride {
            return;
        }
        let poses = poses.max(self.pose_capacity);
        let stride = points.max(self.point_stride);
        let total = poses * stride;
        self.offsets = vec![0; total];
        self.dir_x = vec![0.0; total];
        self.dir_y = vec![0.0; total];
        self.extents = vec![PoseExtent::default(); poses];
        self.lens = vec![0; poses];
        self.point_stride = stride;
        self.pose_capacity = poses;
    }

    /// `(poses, points per pose)` currently allocated.
    pub fn capacity(&self) -> (usize, usize) {
        (self.pose_capacity, self.point_stride)
    }

    /// Frees every buffer.
    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// Rotates and scales `points` into `slot` for a field of row length
    /// `field_stride`.
    pub fn write_pose(
        &mut self,
        slot: usize,
        points: &[EdgePoint],
        angle_deg: f32,
        scale: f32,
        field_stride: usize,
    ) -> ShapeMatchResult<()> {
        if slot >= self.pose_capacity || points.len() > self.point_stride {
            return Err(ShapeMatchError::Internal(format!(
                "pose arena too small: slot {slot} of {}, {} points of {}",
                self.pose_capacity,
                points.len(),
                self.point_stride
            )));
        }
        let (sin_a, cos_a) = sin_cos_deg(angle_deg);
        let base = slot * self.point_stride;
        let stride = field_stride as isize;
        let mut extent = PoseExtent {
            min_dx: isize::MAX,
            max_dx: isize::MIN,
            min_dy: isize::MAX,
            max_dy: isize::MIN,
        };

        for (i, p) in points.iter().enumerate() {
            let rx = scale * (cos_a * p.x - sin_a * p.y);
            let ry = scale * (sin_a * p.x + cos_a * p.y);
            let ox = rx.round() as isize;
            let oy = ry.round() as isize;
            extent.min_dx = extent.min_dx.min(ox);
            extent.max_dx = extent.max_dx.max(ox);
            extent.min_dy = extent.min_dy.min(oy);
            extent.max_dy = extent.max_dy.max(oy);

            self.offsets[base + i] = oy * stride + ox;
            self.dir_x[base + i] = cos_a * p.dx - sin_a * p.dy;
            self.dir_y[base + i] = sin_a * p.dx + cos_a * p.dy;
        }

        if points.is_empty() {
            extent = PoseExtent::default();
        }
        self.extents[slot] = extent;
        self.lens[slot] = points.len();
        Ok(())
    }

    /// Kernel view of a written slot.
    pub fn pose(&self, slot: usize) -> PoseOffsets<'_> {
        let base = slot * self.point_stride;
        let end = base + self.lens.get(slot).copied().unwrap_or(0);
        PoseOffsets {
            offsets: &self.offsets[base..end],
            dir_x: &self.dir_x[base..end],
            dir_y: &self.dir_y[base..end],
        }
    }

    /// Offset bounds of a written slot.
    pub fn extent(&self, slot: usize) -> PoseExtent {
        self.extents.get(slot).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::PoseArena;
    use crate::model::EdgePoint;

    fn points() -> Vec<EdgePoint> {
        vec![
            EdgePoint {
                x: 3.0,
                y: 0.0,
                dx: 1.0,
                dy: 0.0,
                magnitude: 10.0,
                curvature: 0.0,
            },
            EdgePoint {
                x: 0.0,
                y: -2.0,
                dx: 0.0,
                dy: -1.0,
                magnitude: 10.0,
                curvature: 0.0,
            },
        ]
    }

    #[test]
    fn write_pose_rotates_offsets_and_directions() {
        let mut arena = PoseArena::default();
        arena.ensure_capacity(2, 2);
        arena.write_pose(1, &points(), 90.0, 2.0, 100).unwrap();

        let pose = arena.pose(1);
        assert_eq!(pose.len(), 2);
        // (3, 0) -> (0, 6); (0, -2) -> (4, 0)
        assert_eq!(pose.offsets, &[600, 4]);
        assert!(pose.dir_x[0].abs() < 1e-6 && (pose.dir_y[0] - 1.0).abs() < 1e-6);
        assert!((pose.dir_x[1] - 1.0).abs() < 1e-6 && pose.dir_y[1].abs() < 1e-6);

        let extent = arena.extent(1);
        assert_eq!((extent.min_dx, extent.max_dx), (0, 4));
        assert_eq!((extent.min_dy, extent.max_dy), (0, 6));
        assert!(extent.fits(10, 10, 15, 17));
        assert!(!extent.fits(10, 10, 14, 17));
    }

    #[test]
    fn capacity_only_grows() {
        let mut arena = PoseArena::default();
        arena.ensure_capacity(4, 10);
        arena.ensure_capacity(2, 20);
        assert_eq!(arena.capacity(), (4, 20));
        assert!(arena.write_pose(4, &points(), 0.0, 1.0, 10).is_err());
        arena.release();
        assert_eq!(arena.capacity(), (0, 0));
    }
}
