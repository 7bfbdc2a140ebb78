use fermat_math::{Dot, Matrix3, Vector3};

/// An oriented bounding box: centre, orthonormal axes (as matrix columns),
/// and per-axis half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Vector3,
    pub axes: Matrix3,
    pub half_extents: Vector3,
}

impl Obb {
    pub fn new(center: Vector3, axes: Matrix3, half_extents: Vector3) -> Obb {
        Obb { center, axes, half_extents }
    }

    pub fn volume(&self) -> f64 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    /// The eight corners of the box, in world space.
    pub fn corners(&self) -> [Vector3; 8] {
        let mut out = [Vector3::zero(); 8];
        let mut idx = 0;
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    let local = Vector3::new(sx * self.half_extents.x, sy * self.half_extents.y, sz * self.half_extents.z);
                    out[idx] = self.center + self.axes.mul_vec(local);
                    idx += 1;
                }
            }
        }
        out
    }

    /// 15-axis separating axis test: the three face normals of each box,
    /// plus the nine pairwise cross products of their edge directions.
    pub fn overlaps(&self, other: &Obb) -> bool {
        let a = [self.axes.column(0), self.axes.column(1), self.axes.column(2)];
        let b = [other.axes.column(0), other.axes.column(1), other.axes.column(2)];
        let d = other.center - self.center;

        let mut r = [[0.0f64; 3]; 3];
        let mut abs_r = [[0.0f64; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = a[i].dot(b[j]);
                abs_r[i][j] = r[i][j].abs() + 1e-9;
            }
        }

        let ea = [self.half_extents.x, self.half_extents.y, self.half_extents.z];
        let eb = [other.half_extents.x, other.half_extents.y, other.half_extents.z];
        let t = [d.dot(a[0]), d.dot(a[1]), d.dot(a[2])];

        // Face normals of `self`.
        for i in 0..3 {
            let ra = ea[i];
            let rb = eb[0] * abs_r[i][0] + eb[1] * abs_r[i][1] + eb[2] * abs_r[i][2];
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        // Face normals of `other`.
        for j in 0..3 {
            let ra = ea[0] * abs_r[0][j] + ea[1] * abs_r[1][j] + ea[2] * abs_r[2][j];
            let rb = eb[j];
            let tj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if tj.abs() > ra + rb {
                return false;
            }
        }

        // Nine cross-product axes.
        for i in 0..3 {
            for j in 0..3 {
                let i1 = (i + 1) % 3;
                let i2 = (i + 2) % 3;
                let j1 = (j + 1) % 3;
                let j2 = (j + 2) % 3;

                let ra = ea[i1] * abs_r[i2][j] + ea[i2] * abs_r[i1][j];
                let rb = eb[j1] * abs_r[i][j2] + eb[j2] * abs_r[i][j1];
                let tl = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if tl.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }

    /// Union of two OBBs expressed in the parent's axis frame: the tight
    /// axis-aligned box around both (in `axes`-local coordinates), widened
    /// back into centre/half-extent form. Used while building internal
    /// tree nodes from two already-fitted children.
    pub fn merge(axes: Matrix3, a: &Obb, b: &Obb) -> Obb {
        let axes_t = axes.transpose();
        let mut min = Vector3::splat(f64::MAX);
        let mut max = Vector3::splat(f64::MIN);
        for corner in a.corners().into_iter().chain(b.corners()) {
            let local = axes_t.mul_vec(corner);
            min = min.min(local);
            max = max.max(local);
        }

        let center_local = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        Obb { center: axes.mul_vec(center_local), axes, half_extents: half }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identical_boxes_overlap() {
        let o = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(1.0));
        assert!(o.overlaps(&o));
    }

    #[test]
    fn far_apart_boxes_do_not_overlap() {
        let a = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(1.0));
        let b = Obb::new(Vector3::new(10.0, 0.0, 0.0), Matrix3::identity(), Vector3::splat(1.0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlap_test_is_symmetric() {
        let a = Obb::new(Vector3::zero(), Matrix3::identity(), Vector3::splat(1.0));
        let b = Obb::new(Vector3::new(1.5, 0.0, 0.0), Matrix3::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), 0.7), Vector3::splat(1.0));
        assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }
}
