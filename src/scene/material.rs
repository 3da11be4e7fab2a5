use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

pub mod keys {
    pub const NAME: &str = "name";
    pub const SHADING_MODEL: &str = "shading_model";
    pub const COLOR_DIFFUSE: &str = "color.diffuse";
    pub const COLOR_EMISSIVE: &str = "color.emissive";
    pub const COLOR_AMBIENT: &str = "color.ambient";
    pub const COLOR_SPECULAR: &str = "color.specular";
    pub const COLOR_TRANSPARENT: &str = "color.transparent";
    pub const COLOR_REFLECTIVE: &str = "color.reflective";
    pub const SHININESS: &str = "shininess";
    pub const SHININESS_STRENGTH: &str = "shininess_strength";
    pub const TRANSPARENCY_FACTOR: &str = "transparency_factor";
    pub const OPACITY: &str = "opacity";
    pub const REFLECTIVITY: &str = "reflectivity";
    pub const BUMP_SCALING: &str = "bump_scaling";
    pub const DISPLACEMENT_SCALING: &str = "displacement_scaling";
    pub const BASE_COLOR: &str = "pbr.base_color";
    pub const USE_COLOR_MAP: &str = "pbr.use_color_map";
    pub const METALLIC_FACTOR: &str = "pbr.metallic_factor";
    pub const USE_METALLIC_MAP: &str = "pbr.use_metallic_map";
    pub const ROUGHNESS_FACTOR: &str = "pbr.roughness_factor";
    pub const USE_ROUGHNESS_MAP: &str = "pbr.use_roughness_map";
    pub const USE_EMISSIVE_MAP: &str = "pbr.use_emissive_map";
    pub const EMISSIVE_INTENSITY: &str = "pbr.emissive_intensity";
    pub const USE_AO_MAP: &str = "pbr.use_ao_map";
    /// Prefix for properties passed through untouched.
    pub const RAW_PREFIX: &str = "$raw.";
}

pub const DEFAULT_MATERIAL_NAME: &str = "DefaultMaterial";

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShadingMode {
    Gouraud = 2,
    Phong = 3,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub translation: Vec2,
    pub scaling: Vec2,
    pub rotation: f32,
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scaling: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MaterialProperty {
    Float(f32),
    Int(i32),
    Color(Vec3),
    String(String),
    Shading(ShadingMode),
    UvTransform(UvTransform),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureType {
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normals,
    Shininess,
    Opacity,
    Displacement,
    Reflection,
    BaseColor,
    NormalCamera,
    EmissionColor,
    Metalness,
    DiffuseRoughness,
    AmbientOcclusion,
    MayaBase,
    MayaSpecular,
    MayaSpecularColor,
    MayaSpecularRoughness,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextureSlot {
    pub texture_type: TextureType,
    /// Layer index within the slot.
    pub index: u32,
    pub path: String,
    pub uv_transform: UvTransform,
    pub uv_index: u32,
    /// Only set for layered textures.
    pub blend_mode: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub properties: BTreeMap<String, MaterialProperty>,
    pub textures: Vec<TextureSlot>,
}

impl Material {
    pub fn set(&mut self, key: &str, value: MaterialProperty) {
        self.properties.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MaterialProperty> {
        self.properties.get(key)
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        match self.properties.get(key)? {
            MaterialProperty::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        match self.properties.get(key)? {
            MaterialProperty::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn color(&self, key: &str) -> Option<Vec3> {
        match self.properties.get(key)? {
            MaterialProperty::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self.properties.get(keys::NAME)? {
            MaterialProperty::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn texture(&self, texture_type: TextureType, index: u32) -> Option<&TextureSlot> {
        self.textures
            .iter()
            .find(|t| t.texture_type == texture_type && t.index == index)
    }
}

/// Compressed texture data taken from an embedded video.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EmbeddedTexture {
    pub data: Vec<u8>,
    /// File extension, at most three characters, or empty.
    pub format_hint: String,
    pub file_name: String,
}
