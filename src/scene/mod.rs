//! Output scene produced by the converter.

use serde::{Deserialize, Serialize};

pub mod animation;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;

pub use animation::{Animation, MorphAnimation, MorphKey, NodeAnimation, QuatKey, VectorKey};
pub use light::{Camera, Light, LightSourceType};
pub use material::{
    keys, EmbeddedTexture, Material, MaterialProperty, ShadingMode, TextureSlot, TextureType, UvTransform,
    DEFAULT_MATERIAL_NAME,
};
pub use mesh::{Bone, Mesh, MorphTarget, PrimitiveTypes, Skeleton, SkeletonBone, TangentSpace, TexCoords, VertexWeight};
pub use node::{Metadata, MetadataValue, Node};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub root: Node,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
    pub lights: Vec<Light>,
    pub cameras: Vec<Camera>,
    pub textures: Vec<EmbeddedTexture>,
    pub skeletons: Vec<Skeleton>,
    pub metadata: Metadata,
    /// Set when the document produced no meshes.
    pub incomplete: bool,
}

impl Scene {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |_| count += 1);
        count
    }
}
