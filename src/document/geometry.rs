use glam::{Vec2, Vec3, Vec4};

use crate::error::{ConvertError, Result};

#[derive(Debug, Clone)]
pub struct UvChannel {
    pub name: String,
    pub coords: Vec<Vec2>,
}

/// Polygon mesh with all attributes expanded to one entry per face vertex.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    pub name: String,
    vertices: Vec<Vec3>,
    faces: Vec<u32>,
    face_starts: Vec<u32>,
    mapping_offsets: Vec<u32>,
    mapping_counts: Vec<u32>,
    mappings: Vec<u32>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,
    binormals: Vec<Vec3>,
    uvs: Vec<UvChannel>,
    colors: Vec<Vec<Vec4>>,
    material_indices: Vec<i32>,
}

impl MeshGeometry {
    /// Builds the geometry from control points and an FBX polygon vertex index,
    /// where a negative entry `i` closes the polygon and stands for `-(i + 1)`.
    pub fn new(name: &str, control_points: &[Vec3], polygon_vertex_index: &[i32]) -> Result<Self> {
        let mut vertices = Vec::with_capacity(polygon_vertex_index.len());
        let mut faces = Vec::new();
        let mut face_starts = Vec::new();
        let mut per_point: Vec<Vec<u32>> = vec![vec![]; control_points.len()];

        let mut current = 0u32;
        for &raw in polygon_vertex_index {
            let index = if raw < 0 { -(raw + 1) } else { raw };
            let point = control_points
                .get(index as usize)
                .ok_or_else(|| ConvertError::IndexOutOfRange {
                    name: name.to_string(),
                    what: "control point",
                    index: index as i64,
                })?;
            if current == 0 {
                face_starts.push(vertices.len() as u32);
            }
            per_point[index as usize].push(vertices.len() as u32);
            vertices.push(*point);
            current += 1;
            if raw < 0 {
                faces.push(current);
                current = 0;
            }
        }
        if current > 0 {
            faces.push(current);
        }

        let mut mapping_offsets = Vec::with_capacity(per_point.len());
        let mut mapping_counts = Vec::with_capacity(per_point.len());
        let mut mappings = Vec::with_capacity(vertices.len());
        for outputs in per_point {
            mapping_offsets.push(mappings.len() as u32);
            mapping_counts.push(outputs.len() as u32);
            mappings.extend(outputs);
        }

        Ok(Self {
            name: name.to_string(),
            vertices,
            faces,
            face_starts,
            mapping_offsets,
            mapping_counts,
            mappings,
            ..Default::default()
        })
    }

    fn check_len(&self, attribute: &'static str, expected: usize, found: usize) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(ConvertError::AttributeLength {
                name: self.name.clone(),
                attribute,
                expected,
                found,
            })
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<Self> {
        self.check_len("normal", self.vertices.len(), normals.len())?;
        self.normals = normals;
        Ok(self)
    }

    pub fn with_tangents(mut self, tangents: Vec<Vec3>) -> Result<Self> {
        self.check_len("tangent", self.vertices.len(), tangents.len())?;
        self.tangents = tangents;
        Ok(self)
    }

    pub fn with_binormals(mut self, binormals: Vec<Vec3>) -> Result<Self> {
        self.check_len("binormal", self.vertices.len(), binormals.len())?;
        self.binormals = binormals;
        Ok(self)
    }

    pub fn with_uv_channel(mut self, name: &str, coords: Vec<Vec2>) -> Result<Self> {
        self.check_len("uv", self.vertices.len(), coords.len())?;
        self.uvs.push(UvChannel {
            name: name.to_string(),
            coords,
        });
        Ok(self)
    }

    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Result<Self> {
        self.check_len("color", self.vertices.len(), colors.len())?;
        self.colors.push(colors);
        Ok(self)
    }

    /// Per-face material indices. A single entry applies to every face.
    pub fn with_material_indices(mut self, indices: Vec<i32>) -> Result<Self> {
        if indices.len() == 1 {
            self.material_indices = vec![indices[0]; self.faces.len()];
        } else {
            self.check_len("material", self.faces.len(), indices.len())?;
            self.material_indices = indices;
        }
        Ok(self)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Vertex count of every face.
    pub fn face_index_counts(&self) -> &[u32] {
        &self.faces
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tangents(&self) -> &[Vec3] {
        &self.tangents
    }

    pub fn binormals(&self) -> &[Vec3] {
        &self.binormals
    }

    pub fn uv_channels(&self) -> &[UvChannel] {
        &self.uvs
    }

    pub fn color_channels(&self) -> &[Vec<Vec4>] {
        &self.colors
    }

    pub fn material_indices(&self) -> &[i32] {
        &self.material_indices
    }

    /// Output vertices generated from a control point.
    pub fn to_output_vertex_index(&self, control_point: u32) -> Option<&[u32]> {
        let offset = *self.mapping_offsets.get(control_point as usize)? as usize;
        let count = self.mapping_counts[control_point as usize] as usize;
        Some(&self.mappings[offset..offset + count])
    }

    pub fn face_for_vertex_index(&self, vertex: u32) -> Option<usize> {
        if vertex as usize >= self.vertices.len() {
            return None;
        }
        Some(self.face_starts.partition_point(|&start| start <= vertex) - 1)
    }
}

/// Polylines; a negative index ends a polyline and stands for `-(i + 1)`.
#[derive(Debug, Clone, Default)]
pub struct LineGeometry {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<i32>,
}

/// Sparse blend shape target.
#[derive(Debug, Clone, Default)]
pub struct ShapeGeometry {
    pub name: String,
    indices: Vec<u32>,
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl ShapeGeometry {
    pub fn new(name: &str, indices: Vec<u32>, vertices: Vec<Vec3>, normals: Vec<Vec3>) -> Result<Self> {
        let shape = Self {
            name: name.to_string(),
            indices,
            vertices,
            normals,
        };
        if shape.vertices.len() != shape.indices.len() {
            return Err(ConvertError::AttributeLength {
                name: shape.name,
                attribute: "shape vertex",
                expected: shape.indices.len(),
                found: shape.vertices.len(),
            });
        }
        if !shape.normals.is_empty() && shape.normals.len() != shape.indices.len() {
            return Err(ConvertError::AttributeLength {
                name: shape.name,
                attribute: "shape normal",
                expected: shape.indices.len(),
                found: shape.normals.len(),
            });
        }
        Ok(shape)
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }
}
