use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Face kinds present in a mesh.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PrimitiveTypes: u32 {
        const POINT = 1;
        const LINE = 1 << 1;
        const TRIANGLE = 1 << 2;
        const POLYGON = 1 << 3;
    }
}

impl Default for PrimitiveTypes {
    fn default() -> Self {
        Self::empty()
    }
}

impl PrimitiveTypes {
    pub fn for_face(vertex_count: u32) -> Self {
        match vertex_count {
            1 => Self::POINT,
            2 => Self::LINE,
            3 => Self::TRIANGLE,
            _ => Self::POLYGON,
        }
    }
}

/// Tangents and bitangents only exist together.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TangentSpace {
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TexCoords {
    pub name: String,
    pub coords: Vec<Vec2>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex_id: u32,
    pub weight: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Mesh space to bone space in bind pose.
    pub offset: Mat4,
    pub weights: Vec<VertexWeight>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MorphTarget {
    pub name: String,
    /// Per-vertex position deltas.
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub weight: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub name: String,
    pub primitive_types: PrimitiveTypes,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangent_space: Option<TangentSpace>,
    pub texture_coords: Vec<TexCoords>,
    pub colors: Vec<Vec<Vec4>>,
    /// Each face is a run of vertex indices.
    pub faces: Vec<Vec<u32>>,
    pub material_index: u32,
    pub bones: Vec<Bone>,
    pub morph_targets: Vec<MorphTarget>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkeletonBone {
    pub name: String,
    /// -1 for bones without a parent in the skeleton.
    pub parent: i32,
    pub mesh_index: u32,
    pub offset: Mat4,
    pub weights: Vec<VertexWeight>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Skeleton {
    pub bones: Vec<SkeletonBone>,
}
