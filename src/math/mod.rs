//! Small vector types used for screen-space vertices.

pub mod vec3;

pub use vec3::Vec3;
