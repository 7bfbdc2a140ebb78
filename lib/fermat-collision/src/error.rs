use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollisionError {
    #[error("invalid shape parameter: {0}")]
    InvalidShape(&'static str),
    #[error("unknown geom id")]
    UnknownGeom,
    #[error("trimesh has no triangles")]
    EmptyTriMesh,
}
