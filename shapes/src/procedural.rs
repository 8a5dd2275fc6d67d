//! Procedurally generated meshes.
//!
//! Triangles are wound so that front faces point away from the solid.

use crate::mesh::TriangleMesh;
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::Result;
use std::collections::HashMap;

impl TriangleMesh {
    /// Create a sphere by recursively subdividing an icosahedron. Each level
    /// of detail splits every triangle into four. The icosahedron is rotated
    /// so that the z-axis passes through the centers of two opposite faces.
    ///
    /// * `radius` - Sphere radius.
    /// * `detail` - Number of subdivision levels.
    pub fn icosphere(radius: Float, detail: u32) -> Result<Self> {
        let t = (1.0 + 5.0_f64.sqrt()) / 2.0;

        // Rotate about the y-axis so the center of face (4, 9, 5) lies on +z.
        let phi = -t.atan2(2.0 * t + 1.0);
        let (sin_phi, cos_phi) = phi.sin_cos();

        let mut vertices: Vec<[f64; 3]> = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ]
        .iter()
        .map(|&[x, y, z]| unit([x * cos_phi + z * sin_phi, y, z * cos_phi - x * sin_phi]))
        .collect();

        let mut faces: Vec<[usize; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..detail {
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<[f64; 3]>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let [ax, ay, az] = vertices[a];
                    let [bx, by, bz] = vertices[b];
                    vertices.push(unit([ax + bx, ay + by, az + bz]));
                    vertices.len() - 1
                })
            };

            faces = faces
                .iter()
                .flat_map(|&[a, b, c]| {
                    let ab = midpoint(a, b, &mut vertices);
                    let bc = midpoint(b, c, &mut vertices);
                    let ca = midpoint(c, a, &mut vertices);
                    [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]
                })
                .collect();
        }

        let r = radius as f64;
        let positions = vertices
            .iter()
            .map(|&[x, y, z]| Point3::new((x * r) as Float, (y * r) as Float, (z * r) as Float))
            .collect();
        let indices = faces.into_iter().flatten().collect();
        Self::new(positions, Some(indices))
    }

    /// Create a UV sphere. Triangles that would collapse at the poles are
    /// left out.
    ///
    /// * `radius`          - Sphere radius.
    /// * `width_segments`  - Number of segments around the z-axis (at least 3).
    /// * `height_segments` - Number of segments from pole to pole (at least 2).
    pub fn uv_sphere(radius: Float, width_segments: usize, height_segments: usize) -> Result<Self> {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut positions = vec![];
        let mut uvs = vec![];
        for iy in 0..=height_segments {
            let v = iy as Float / height_segments as Float;
            for ix in 0..=width_segments {
                let u = ix as Float / width_segments as Float;
                let (sin_theta, cos_theta) = (v * PI).sin_cos();
                let (sin_phi, cos_phi) = (u * TWO_PI).sin_cos();
                positions.push(Point3::new(
                    -radius * cos_phi * sin_theta,
                    radius * cos_theta,
                    radius * sin_phi * sin_theta,
                ));
                uvs.push(Point2::new(u, 1.0 - v));
            }
        }

        let row = width_segments + 1;
        let mut indices = vec![];
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend([a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend([b, c, d]);
                }
            }
        }

        Self::new(positions, Some(indices))?.with_uvs(uvs)
    }

    /// Create a torus centered at the origin around the z-axis.
    ///
    /// * `radius`            - Distance from the center of the torus to the center of the tube.
    /// * `tube`              - Tube radius.
    /// * `radial_segments`   - Number of segments around the tube.
    /// * `tubular_segments`  - Number of segments around the torus.
    pub fn torus(
        radius: Float,
        tube: Float,
        radial_segments: usize,
        tubular_segments: usize,
    ) -> Result<Self> {
        let radial_segments = radial_segments.max(3);
        let tubular_segments = tubular_segments.max(3);

        let mut positions = vec![];
        let mut uvs = vec![];
        for j in 0..=radial_segments {
            let v = j as Float / radial_segments as Float * TWO_PI;
            for i in 0..=tubular_segments {
                let u = i as Float / tubular_segments as Float * TWO_PI;
                positions.push(Point3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                ));
                uvs.push(Point2::new(
                    i as Float / tubular_segments as Float,
                    j as Float / radial_segments as Float,
                ));
            }
        }

        let row = tubular_segments + 1;
        let mut indices = vec![];
        for j in 1..=radial_segments {
            for i in 1..=tubular_segments {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend([a, b, d, b, c, d]);
            }
        }

        Self::new(positions, Some(indices))?.with_uvs(uvs)
    }

    /// Create an axis aligned box centered at the origin with four vertices
    /// per face.
    ///
    /// * `width`  - Size along the x-axis.
    /// * `height` - Size along the y-axis.
    /// * `depth`  - Size along the z-axis.
    pub fn cuboid(width: Float, height: Float, depth: Float) -> Result<Self> {
        let half = Vector3::new(width / 2.0, height / 2.0, depth / 2.0);

        // (u axis, v axis, normal axis, u sign, v sign, normal sign)
        let faces = [
            (Axis::Z, Axis::Y, Axis::X, -1.0, -1.0, 1.0),
            (Axis::Z, Axis::Y, Axis::X, 1.0, -1.0, -1.0),
            (Axis::X, Axis::Z, Axis::Y, 1.0, 1.0, 1.0),
            (Axis::X, Axis::Z, Axis::Y, 1.0, -1.0, -1.0),
            (Axis::X, Axis::Y, Axis::Z, 1.0, -1.0, 1.0),
            (Axis::X, Axis::Y, Axis::Z, -1.0, -1.0, -1.0),
        ];

        let mut positions = vec![];
        let mut uvs = vec![];
        let mut indices = vec![];
        for (u_axis, v_axis, w_axis, u_sign, v_sign, w_sign) in faces {
            let base = positions.len();
            for (iy, ix) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let mut p = Point3f::ZERO;
                p[u_axis] = (ix as Float * 2.0 - 1.0) * half[u_axis] * u_sign;
                p[v_axis] = (iy as Float * 2.0 - 1.0) * half[v_axis] * v_sign;
                p[w_axis] = half[w_axis] * w_sign;
                positions.push(p);
                uvs.push(Point2::new(ix as Float, 1.0 - iy as Float));
            }
            indices.extend([base, base + 2, base + 1, base + 2, base + 3, base + 1]);
        }

        Self::new(positions, Some(indices))?.with_uvs(uvs)
    }
}

/// Returns the vector scaled to unit length.
fn unit([x, y, z]: [f64; 3]) -> [f64; 3] {
    let len = (x * x + y * y + z * z).sqrt();
    [x / len, y / len, z / len]
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
