use fermat_math::{Dot, IsZero, Matrix3, Vector3};

use crate::error::CollisionError;

/// A rigid placement in world space: orientation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rot: Matrix3,
    pub tr: Vector3,
}

impl Pose {
    pub fn identity() -> Pose {
        Pose { rot: Matrix3::identity(), tr: Vector3::zero() }
    }

    pub fn new(rot: Matrix3, tr: Vector3) -> Pose {
        Pose { rot, tr }
    }

    pub fn to_world(&self, local: Vector3) -> Vector3 {
        self.rot.mul_vec(local) + self.tr
    }

    pub fn to_local(&self, world: Vector3) -> Vector3 {
        self.rot.transpose().mul_vec(world - self.tr)
    }

    /// Composes `self` applied after `inner`: `self * inner`.
    pub fn compose(&self, inner: &Pose) -> Pose {
        Pose { rot: self.rot * inner.rot, tr: self.rot.mul_vec(inner.tr) + self.tr }
    }
}

/// A single un-transformed collision primitive. Shapes carry no pose of
/// their own; callers supply a [`Pose`] at query time (`Offset` is the one
/// exception, nesting a local pose around a child shape).
#[derive(Debug, Clone)]
pub enum Shape {
    Sphere { radius: f64 },
    Box { half_extents: Vector3 },
    Capsule { radius: f64, half_height: f64 },
    Cylinder { radius: f64, half_height: f64 },
    /// Plane through the origin of the geom's local frame with the given
    /// outward normal (unit length) and signed distance from the world
    /// origin along that normal.
    Plane { normal: Vector3, offset: f64 },
    Triangle { p: [Vector3; 3] },
    TriMesh { vertices: Vec<Vector3>, triangles: Vec<[u32; 3]> },
    /// A child shape displaced by a fixed local pose. Two nested offsets
    /// are collapsed at construction time so `Offset(Offset(s, p1), p2)`
    /// is always stored as a single `Offset(s, p2.compose(&p1))`.
    Offset { shape: Box<Shape>, pose: Pose },
}

impl Shape {
    pub fn sphere(radius: f64) -> Result<Shape, CollisionError> {
        if radius <= 0.0 {
            return Err(CollisionError::InvalidShape("sphere radius must be positive"));
        }
        Ok(Shape::Sphere { radius })
    }

    pub fn boxed(half_extents: Vector3) -> Result<Shape, CollisionError> {
        if half_extents.x <= 0.0 || half_extents.y <= 0.0 || half_extents.z <= 0.0 {
            return Err(CollisionError::InvalidShape("box half-extents must be positive"));
        }
        Ok(Shape::Box { half_extents })
    }

    pub fn capsule(radius: f64, half_height: f64) -> Result<Shape, CollisionError> {
        if radius <= 0.0 || half_height < 0.0 {
            return Err(CollisionError::InvalidShape("capsule radius must be positive and half-height non-negative"));
        }
        Ok(Shape::Capsule { radius, half_height })
    }

    pub fn cylinder(radius: f64, half_height: f64) -> Result<Shape, CollisionError> {
        if radius <= 0.0 || half_height <= 0.0 {
            return Err(CollisionError::InvalidShape("cylinder radius and half-height must be positive"));
        }
        Ok(Shape::Cylinder { radius, half_height })
    }

    pub fn plane(normal: Vector3, offset: f64) -> Result<Shape, CollisionError> {
        if normal.magnitude_squared() < 1e-16 {
            return Err(CollisionError::InvalidShape("plane normal must be non-zero"));
        }
        Ok(Shape::Plane { normal: normal.normalized(), offset })
    }

    pub fn triangle(p0: Vector3, p1: Vector3, p2: Vector3) -> Shape {
        Shape::Triangle { p: [p0, p1, p2] }
    }

    pub fn trimesh(vertices: Vec<Vector3>, triangles: Vec<[u32; 3]>) -> Result<Shape, CollisionError> {
        if triangles.is_empty() {
            return Err(CollisionError::EmptyTriMesh);
        }
        Ok(Shape::TriMesh { vertices, triangles })
    }

    /// Wraps `self` in a local offset, collapsing with an existing
    /// enclosing offset so associativity holds regardless of how many
    /// times a shape is re-offset.
    pub fn offset(self, pose: Pose) -> Shape {
        match self {
            Shape::Offset { shape, pose: inner } => Shape::Offset { shape, pose: pose.compose(&inner) },
            other => Shape::Offset { shape: Box::new(other), pose },
        }
    }

    /// A short tag used to index the pairwise dispatch table.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere { .. } => ShapeKind::Sphere,
            Shape::Box { .. } => ShapeKind::Box,
            Shape::Capsule { .. } => ShapeKind::Capsule,
            Shape::Cylinder { .. } => ShapeKind::Cylinder,
            Shape::Plane { .. } => ShapeKind::Plane,
            Shape::Triangle { .. } => ShapeKind::Triangle,
            Shape::TriMesh { .. } => ShapeKind::TriMesh,
            Shape::Offset { shape, .. } => shape.kind(),
        }
    }

    /// Resolves through any `Offset` wrapper, returning the innermost
    /// shape and the pose it sits at relative to `outer`.
    pub fn resolve<'a>(&'a self, outer: &Pose) -> (&'a Shape, Pose) {
        match self {
            Shape::Offset { shape, pose } => shape.resolve(&outer.compose(pose)),
            other => (other, *outer),
        }
    }

    /// The farthest point of the shape, in world space, along `dir`
    /// (unit length). Used by the GJK/EPA fallback for shape pairs with
    /// no specialised dispatch entry.
    pub fn support(&self, pose: &Pose, dir: Vector3) -> Vector3 {
        let (shape, pose) = self.resolve(pose);
        let local_dir = pose.rot.transpose().mul_vec(dir);
        let local = match shape {
            Shape::Sphere { radius } => local_dir.normalized() * *radius,
            Shape::Box { half_extents } => Vector3::new(
                half_extents.x * local_dir.x.signum(),
                half_extents.y * local_dir.y.signum(),
                half_extents.z * local_dir.z.signum(),
            ),
            Shape::Capsule { radius, half_height } => {
                let axis_sign = local_dir.z.signum();
                let axial = Vector3::new(0.0, 0.0, axis_sign * half_height);
                axial + local_dir.normalized() * *radius
            }
            Shape::Cylinder { radius, half_height } => {
                let axial = Vector3::new(0.0, 0.0, local_dir.z.signum() * half_height);
                let radial = Vector3::new(local_dir.x, local_dir.y, 0.0);
                let radial = if radial.is_zero() { Vector3::zero() } else { radial.normalized() * *radius };
                axial + radial
            }
            Shape::Plane { normal, .. } => *normal * 1e6 * local_dir.dot(*normal).signum(),
            Shape::Triangle { p } => {
                *p.iter().max_by(|a, b| a.dot(local_dir).partial_cmp(&b.dot(local_dir)).unwrap()).unwrap()
            }
            Shape::TriMesh { vertices, .. } => *vertices
                .iter()
                .max_by(|a, b| a.dot(local_dir).partial_cmp(&b.dot(local_dir)).unwrap())
                .unwrap_or(&Vector3::zero()),
            Shape::Offset { .. } => unreachable!("resolve() already unwraps Offset"),
        };
        pose.to_world(local)
    }

    /// Conservative local-frame half-extents, used to build OBB leaves.
    pub fn local_half_extents(&self) -> Vector3 {
        match self {
            Shape::Sphere { radius } => Vector3::splat(*radius),
            Shape::Box { half_extents } => *half_extents,
            Shape::Capsule { radius, half_height } => Vector3::new(*radius, *radius, half_height + radius),
            Shape::Cylinder { radius, half_height } => Vector3::new(*radius, *radius, *half_height),
            Shape::Plane { .. } => Vector3::splat(1e6),
            Shape::Triangle { p } => {
                let min = p[0].min(p[1]).min(p[2]);
                let max = p[0].max(p[1]).max(p[2]);
                (max - min) * 0.5
            }
            Shape::TriMesh { vertices, .. } => {
                let mut min = vertices[0];
                let mut max = vertices[0];
                for &v in vertices {
                    min = min.min(v);
                    max = max.max(v);
                }
                (max - min) * 0.5
            }
            Shape::Offset { shape, .. } => shape.local_half_extents(),
        }
    }

    pub fn local_center(&self) -> Vector3 {
        match self {
            Shape::Triangle { p } => (p[0] + p[1] + p[2]) / 3.0,
            Shape::TriMesh { vertices, .. } => {
                let mut min = vertices[0];
                let mut max = vertices[0];
                for &v in vertices {
                    min = min.min(v);
                    max = max.max(v);
                }
                (min + max) * 0.5
            }
            Shape::Offset { shape, pose } => pose.to_world(shape.local_center()),
            _ => Vector3::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Box,
    Capsule,
    Cylinder,
    Plane,
    Triangle,
    TriMesh,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_offsets_collapse_to_one() {
        let s = Shape::sphere(1.0).unwrap();
        let s = s.offset(Pose::new(Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0)));
        let s = s.offset(Pose::new(Matrix3::identity(), Vector3::new(0.0, 2.0, 0.0)));
        match s {
            Shape::Offset { shape, pose } => {
                assert!(matches!(*shape, Shape::Sphere { .. }));
                assert_eq!(pose.tr, Vector3::new(1.0, 2.0, 0.0));
            }
            _ => panic!("expected Offset"),
        }
    }

    #[test]
    fn sphere_support_is_on_surface() {
        let s = Shape::sphere(2.0).unwrap();
        let pose = Pose::identity();
        let p = s.support(&pose, Vector3::new(1.0, 0.0, 0.0));
        assert!((p.magnitude() - 2.0).abs() < 1e-9);
    }
}
