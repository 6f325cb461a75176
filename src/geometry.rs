//! Triangles and the scene that feeds them to the pipeline.
//!
//! # Winding convention
//!
//! Coverage is decided by three edge functions evaluated in the fixed
//! cyclic order `(v1 → v2)`, `(v2 → v0)`, `(v0 → v1)`; a pixel is covered
//! when all three are `>= 0`. That only happens for triangles with positive
//! signed area `edge(v0, v1, v2)`, which on a y-down screen means the
//! vertices run counter-clockwise. [`Scene::push`] reverses clockwise input
//! and rejects zero-area input; the rasterizer reverses clockwise triangles
//! from any other [`GeometrySource`] as well.

use log::debug;
use thiserror::Error;

use crate::math::Vec3;
use crate::render::rasterizer::edge_function;
use crate::texture::Texture;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("degenerate triangle (zero area): {0:?}")]
    Degenerate([Vec3; 3]),
    #[error("triangle has a non-finite coordinate: {0:?}")]
    NonFinite([Vec3; 3]),
}

/// Vertex order of a triangle as seen on a y-down screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Positive signed area; the order the rasterizer covers.
    CounterClockwise,
    /// Negative signed area; reversed before rasterization.
    Clockwise,
    /// Zero area; covers no interior.
    Degenerate,
}

/// A screen-space triangle. `z` of each vertex is its depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
}

impl Triangle {
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Twice the signed area, `edge(v0, v1, v2)`.
    #[inline]
    pub fn signed_area(&self) -> f32 {
        let [v0, v1, v2] = self.vertices;
        edge_function(v0, v1, v2)
    }

    pub fn winding(&self) -> Winding {
        let area = self.signed_area();
        if area > 0.0 {
            Winding::CounterClockwise
        } else if area < 0.0 {
            Winding::Clockwise
        } else {
            Winding::Degenerate
        }
    }

    /// The same triangle in canonical (counter-clockwise) order.
    ///
    /// Clockwise input gets `v1` and `v2` swapped, which keeps the covered
    /// region and the flat depth unchanged. Other input is returned as is.
    pub fn canonical(self) -> Self {
        match self.winding() {
            Winding::Clockwise => {
                let [v0, v1, v2] = self.vertices;
                Self::new(v0, v2, v1)
            }
            _ => self,
        }
    }

    /// Flat depth shared by every covered pixel: the mean of the vertex depths.
    #[inline]
    pub fn flat_depth(&self) -> f32 {
        let [v0, v1, v2] = self.vertices;
        ((v0 + v1 + v2) / 3.0).z
    }

    /// Screen-space bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let [v0, v1, v2] = self.vertices;
        (
            v0.x.min(v1.x).min(v2.x),
            v0.y.min(v1.y).min(v2.y),
            v0.x.max(v1.x).max(v2.x),
            v0.y.max(v1.y).max(v2.y),
        )
    }

    fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }
}

/// Supplies the triangles and texture rasterized each frame.
///
/// Triangles may come in either winding; the rasterizer reverses clockwise
/// ones. Degenerate triangles cover at most the pixels on their line.
pub trait GeometrySource: Sync {
    fn triangles(&self) -> &[Triangle];
    fn texture(&self) -> &Texture;
}

/// An ordered list of canonical triangles sharing one texture.
#[derive(Clone, Debug)]
pub struct Scene {
    triangles: Vec<Triangle>,
    texture: Texture,
}

impl Scene {
    pub fn new(texture: Texture) -> Self {
        Self {
            triangles: Vec::new(),
            texture,
        }
    }

    /// The fixed triangle (400,100)-(200,500)-(600,500) at depth 0.5 over
    /// the 64×64 checker.
    pub fn reference() -> Self {
        let mut scene = Self::new(Texture::reference_checker());
        scene.triangles.push(reference_triangle());
        scene
    }

    /// Add a triangle, reversing it if it is clockwise.
    ///
    /// Returns the winding the triangle was supplied with.
    pub fn push(&mut self, triangle: Triangle) -> Result<Winding, GeometryError> {
        if !triangle.is_finite() {
            return Err(GeometryError::NonFinite(triangle.vertices));
        }
        let winding = triangle.winding();
        match winding {
            Winding::Degenerate => return Err(GeometryError::Degenerate(triangle.vertices)),
            Winding::Clockwise => {
                debug!("reversing clockwise triangle {:?}", triangle.vertices);
            }
            Winding::CounterClockwise => {}
        }
        self.triangles.push(triangle.canonical());
        Ok(winding)
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
    }

    pub fn set_texture(&mut self, texture: Texture) {
        self.texture = texture;
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

impl GeometrySource for Scene {
    fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    fn texture(&self) -> &Texture {
        &self.texture
    }
}

/// The single triangle the reference scene draws.
pub fn reference_triangle() -> Triangle {
    Triangle::new(
        Vec3::new(400.0, 100.0, 0.5),
        Vec3::new(200.0, 500.0, 0.5),
        Vec3::new(600.0, 500.0, 0.5),
    )
}
