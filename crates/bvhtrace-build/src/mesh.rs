//! Indexed triangle meshes as build input.

use bvhtrace::Triangle;
use bvhtrace_math::Point3;

use crate::error::{BuildError, Result};

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unindexed mesh with three fresh vertices per triangle.
    pub fn from_triangles(triangles: &[Triangle]) -> Self {
        let mut mesh = Self::new();
        for tri in triangles {
            for p in [tri.v0, tri.v1, tri.v2] {
                mesh.indices.push(mesh.vertex_count() as u32);
                mesh.vertices.extend_from_slice(&[p.x, p.y, p.z]);
            }
        }
        mesh
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Position of vertex `index`, if it exists.
    pub fn vertex(&self, index: usize) -> Option<Point3> {
        let v = self.vertices.get(3 * index..3 * index + 3)?;
        Some(Point3::new(v[0], v[1], v[2]))
    }

    /// Resolve the index buffer into triangles.
    pub fn triangles(&self) -> Result<Vec<Triangle>> {
        if self.vertices.len() % 3 != 0 {
            return Err(BuildError::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(BuildError::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }

        self.indices
            .chunks_exact(3)
            .map(|idx| {
                let corner = |i: u32| {
                    self.vertex(i as usize).ok_or_else(|| {
                        BuildError::InvalidMesh(format!(
                            "index {i} out of range for {} vertices",
                            self.vertex_count()
                        ))
                    })
                };
                Ok(Triangle::new(corner(idx[0])?, corner(idx[1])?, corner(idx[2])?))
            })
            .collect()
    }
}
