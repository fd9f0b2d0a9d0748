pub mod mesh;
pub mod ray;

pub use mesh::TriangleMesh;
pub use ray::{Plane, Ray, look_at_rotation};
