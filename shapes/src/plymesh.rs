//! PLY mesh.

use crate::mesh::TriangleMesh;
use ply_rs::parser::Parser;
use ply_rs::ply::*;
use raycast_core::geometry::*;
use raycast_core::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Implements PLY mesh loading.
pub struct PLYMesh;

impl PLYMesh {
    /// Load a triangle mesh from a PLY file. Triangles and quads are
    /// supported; quads are split into two triangles. Per vertex uv-coordinates
    /// are kept when every vertex has them.
    ///
    /// * `path` - Path to the PLY file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read(&mut reader, &path.display().to_string())
    }

    /// Read a triangle mesh in PLY format.
    ///
    /// * `reader` - Source of the PLY data.
    /// * `name`   - Name of the source used in error messages.
    pub fn read<R: BufRead>(reader: &mut R, name: &str) -> Result<TriangleMesh> {
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(reader).map_err(|e| Error::Ply {
            path: name.to_string(),
            reason: e.to_string(),
        })?;

        let mut points: Vec<Point3f> = vec![];
        let mut uvs: Vec<Point2f> = vec![];
        let mut has_uvs = true;
        let mut vertex_indices: Vec<usize> = vec![];
        let mut face_count = 0;

        for (element, list) in ply.payload.iter() {
            match element.as_ref() {
                "vertex" => {
                    for elem in list.iter() {
                        let vertex = Self::parse_vertex(elem);
                        points.push(vertex.point);

                        // Continue to record uvs unless we find one missing.
                        has_uvs = has_uvs && vertex.uv.is_some();
                        if let Some(uv) = vertex.uv {
                            uvs.push(uv);
                        }
                    }
                }
                "face" => {
                    for elem in list.iter() {
                        Self::parse_face(elem, &mut vertex_indices).map_err(|reason| {
                            Error::Ply {
                                path: name.to_string(),
                                reason: format!("face {face_count}: {reason}"),
                            }
                        })?;
                        face_count += 1;
                    }
                }
                s => warn!("Ignoring unexpected element '{s}' in '{name}'"),
            }
        }

        if points.is_empty() || face_count == 0 {
            return Err(Error::Ply {
                path: name.to_string(),
                reason: "no face/vertex elements found".to_string(),
            });
        }

        debug!(
            "Read {} vertices and {face_count} faces ({} triangles) from '{name}'",
            points.len(),
            vertex_indices.len() / 3,
        );

        let mesh = TriangleMesh::new(points, Some(vertex_indices))?;
        if has_uvs {
            mesh.with_uvs(uvs)
        } else {
            Ok(mesh)
        }
    }

    /// Parse vertex data. The parser gives one property at a time. UV
    /// coordinates are optional and only kept when both are present.
    ///
    /// * `elem` - A map of property names and values.
    fn parse_vertex(elem: &KeyMap<Property>) -> Vertex {
        let mut p = Point3f::default();
        let mut uv = Point2f::default();
        let mut uvc = 0;

        for (name, value) in elem.iter() {
            let v = match value {
                Property::Float(v) => *v,
                Property::Double(v) => *v as f32,
                _ => {
                    debug!("Ignoring unexpected vertex property type for '{name}'");
                    continue;
                }
            };
            match name.as_ref() {
                "x" => p.x = v,
                "y" => p.y = v,
                "z" => p.z = v,
                "u" | "s" | "texture_u" | "texture_s" => {
                    uv.x = v;
                    uvc += 1;
                }
                "v" | "t" | "texture_v" | "texture_t" => {
                    uv.y = v;
                    uvc += 1;
                }
                s => debug!("Ignoring unexpected vertex element '{s}'"),
            }
        }

        Vertex {
            point: p,
            uv: (uvc == 2).then_some(uv),
        }
    }

    /// Parse face data. Only vertex indices are supported. These can be
    /// present as signed or unsigned lists and are converted to usize.
    ///
    /// * `elem`           - A map of property names and values.
    /// * `vertex_indices` - Receives three indices per triangle.
    fn parse_face(
        elem: &KeyMap<Property>,
        vertex_indices: &mut Vec<usize>,
    ) -> std::result::Result<(), String> {
        for (name, value) in elem.iter() {
            match name.as_ref() {
                "vertex_indices" | "vertex_index" => {
                    let vi: Vec<usize> = match value {
                        Property::ListInt(vi) => vi
                            .iter()
                            .map(|&i| {
                                usize::try_from(i).map_err(|_| format!("negative index {i}"))
                            })
                            .collect::<std::result::Result<_, _>>()?,
                        Property::ListUInt(vi) => vi.iter().map(|&i| i as usize).collect(),
                        Property::ListUChar(vi) => vi.iter().map(|&i| i as usize).collect(),
                        _ => {
                            debug!("Ignoring unexpected face property type");
                            continue;
                        }
                    };
                    match vi.len() {
                        3 => vertex_indices.extend([vi[0], vi[1], vi[2]]),
                        4 => vertex_indices.extend([vi[0], vi[1], vi[2], vi[3], vi[0], vi[2]]),
                        n => {
                            return Err(format!(
                                "only triangles and quads are supported, got {n} vertices"
                            ))
                        }
                    }
                }
                s => debug!("Ignoring unexpected face element '{s}'"),
            }
        }
        Ok(())
    }
}

/// Vertex properties read from a PLY file.
struct Vertex {
    point: Point3f,
    uv: Option<Point2f>,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
