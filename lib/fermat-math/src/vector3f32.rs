use super::Vector3;

/// Single-precision companion to [`Vector3`].
///
/// Per the numeric-semantics note, the core stays in `f64` throughout; this
/// type exists only for OBB leaf storage, where a tree can hold many
/// thousands of nodes and halving the footprint of `center`/`half_extents`
/// is worth the precision we give up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3f32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3f32 {
    pub fn new(x: f32, y: f32, z: f32) -> Vector3f32 {
        Vector3f32 { x, y, z }
    }

    pub fn from_f64(v: Vector3) -> Vector3f32 {
        Vector3f32::new(v.x as f32, v.y as f32, v.z as f32)
    }

    pub fn to_f64(self) -> Vector3 {
        Vector3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

impl From<Vector3> for Vector3f32 {
    fn from(v: Vector3) -> Self {
        Vector3f32::from_f64(v)
    }
}

impl From<Vector3f32> for Vector3 {
    fn from(v: Vector3f32) -> Self {
        v.to_f64()
    }
}
