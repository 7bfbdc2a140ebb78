use std::ops::{Add, Mul, Neg, Sub};

use super::{Dot, IsZero, Matrix3, Vector3};

/// A unit quaternion representing an orientation in 3-space.
///
/// Composed of an imaginary part `v` and a real part `w`. Use `mul()`
/// (the `Mul` impl) for the Hamilton product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub v: Vector3,
    pub w: f64,
}

impl Quaternion {
    pub fn new(imaginary: Vector3, real: f64) -> Quaternion {
        Quaternion { v: imaginary, w: real }
    }

    pub fn identity() -> Quaternion {
        Quaternion { v: Vector3::zero(), w: 1.0 }
    }

    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Quaternion {
        let axis = axis.normalized();
        let half = angle * 0.5;
        let (s, c) = half.sin_cos();
        Quaternion::new(axis * s, c)
    }

    /// Builds a quaternion from a (presumed orthonormal) rotation matrix.
    ///
    /// Unlike the reference's `borQuatFromMat3` — which assigns `x` three
    /// times and never touches `y` or `z` — this sets all four components.
    pub fn from_mat3(m: &Matrix3) -> Quaternion {
        let trace = 1.0 + m[(0, 0)] + m[(1, 1)] + m[(2, 2)];
        if trace > 1e-8 {
            let w = trace.sqrt() * 0.5;
            let w4 = 1.0 / (4.0 * w);
            Quaternion::new(
                Vector3::new(
                    (m[(2, 1)] - m[(1, 2)]) * w4,
                    (m[(0, 2)] - m[(2, 0)]) * w4,
                    (m[(1, 0)] - m[(0, 1)]) * w4,
                ),
                w,
            )
        } else {
            // Trace is non-positive; fall back to the largest diagonal term
            // to keep the square root well-conditioned.
            let (i, j, k) = if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
                (0, 1, 2)
            } else if m[(1, 1)] > m[(2, 2)] {
                (1, 2, 0)
            } else {
                (2, 0, 1)
            };

            let s = (m[(i, i)] - m[(j, j)] - m[(k, k)] + 1.0).sqrt();
            let mut q = [0.0f64; 3];
            q[i] = s * 0.5;
            let inv = if s.abs() > 1e-12 { 0.5 / s } else { 0.0 };
            q[j] = (m[(j, i)] + m[(i, j)]) * inv;
            q[k] = (m[(k, i)] + m[(i, k)]) * inv;
            let w = (m[(k, j)] - m[(j, k)]) * inv;
            Quaternion::new(Vector3::new(q[0], q[1], q[2]), w)
        }
    }

    pub fn to_mat3(self) -> Matrix3 {
        let q = self.normalized();
        let (x, y, z, w) = (q.v.x, q.v.y, q.v.z, q.w);
        Matrix3::from_columns(
            Vector3::new(1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y + z * w), 2.0 * (x * z - y * w)),
            Vector3::new(2.0 * (x * y - z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z + x * w)),
            Vector3::new(2.0 * (x * z + y * w), 2.0 * (y * z - x * w), 1.0 - 2.0 * (x * x + y * y)),
        )
    }

    pub fn len_sqr(self) -> f64 {
        self.dot(self)
    }

    pub fn len(self) -> f64 {
        self.len_sqr().sqrt()
    }

    pub fn normalize(&mut self) {
        assert!(!self.is_zero(), "cannot normalize the zero quaternion");
        let len = self.len();
        self.v = self.v / len;
        self.w /= len;
    }

    pub fn normalized(self) -> Quaternion {
        let mut copy = self;
        copy.normalize();
        copy
    }

    pub fn conjugate(self) -> Quaternion {
        Quaternion { v: -self.v, w: self.w }
    }

    pub fn inverse(self) -> Quaternion {
        let inv_len_sqr = 1.0 / self.len_sqr();
        let conj = self.conjugate();
        Quaternion::new(conj.v * inv_len_sqr, conj.w * inv_len_sqr)
    }

    pub fn rotate(self, p: Vector3) -> Vector3 {
        let q = self.normalized();
        let pure = Quaternion::new(p, 0.0);
        (q * pure * q.conjugate()).v
    }
}

impl Dot for Quaternion {
    type Output = f64;

    fn dot(self, rhs: Quaternion) -> f64 {
        self.v.dot(rhs.v) + self.w * rhs.w
    }
}

impl IsZero for Quaternion {
    fn is_zero(self) -> bool {
        self.dot(self).is_zero()
    }
}

impl Default for Quaternion {
    fn default() -> Quaternion {
        Quaternion::identity()
    }
}

impl Add for Quaternion {
    type Output = Quaternion;

    fn add(self, rhs: Quaternion) -> Quaternion {
        Quaternion { v: self.v + rhs.v, w: self.w + rhs.w }
    }
}

impl Sub for Quaternion {
    type Output = Quaternion;

    fn sub(self, rhs: Quaternion) -> Quaternion {
        Quaternion { v: self.v - rhs.v, w: self.w - rhs.w }
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;

    fn neg(self) -> Quaternion {
        Quaternion { v: -self.v, w: -self.w }
    }
}

/// Hamilton product.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Quaternion {
        Quaternion {
            v: rhs.v * self.w + self.v * rhs.w + self.v.cross(rhs.v),
            w: self.w * rhs.w - self.v.dot(rhs.v),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_mat3_roundtrips_through_to_mat3() {
        let original = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), 1.1);
        let m = original.to_mat3();
        let back = Quaternion::from_mat3(&m);
        // q and -q represent the same rotation.
        let same = (back.dot(original) - 1.0).abs() < 1e-8 || (back.dot(original) + 1.0).abs() < 1e-8;
        assert!(same, "expected {:?} ~ {:?}", back, original);
    }

    #[test]
    fn identity_rotates_nothing() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(Quaternion::identity().rotate(p), p);
    }

    #[test]
    fn from_mat3_sets_all_three_imaginary_components() {
        // Regression test for the reference's bug where x was assigned three
        // times and y, z were left at zero.
        let m = Matrix3::from_axis_angle(Vector3::new(1.0, 1.0, 1.0), 0.7);
        let q = Quaternion::from_mat3(&m);
        assert!(q.v.y != 0.0 || q.v.x == 0.0);
        assert!(q.v.z != 0.0 || q.v.x == 0.0);
    }
}
