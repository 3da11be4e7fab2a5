use std::cell::RefCell;

use glam::{Mat4, Vec2, Vec3};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::geometry::{LineGeometry, MeshGeometry, ShapeGeometry};
use super::properties::PropertyTable;
use crate::error::{ConvertError, Result};

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RotationOrder {
    #[default]
    EulerXyz = 0,
    EulerXzy = 1,
    EulerYzx = 2,
    EulerYxz = 3,
    EulerZxy = 4,
    EulerZyx = 5,
    SphericXyz = 6,
}

impl RotationOrder {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => RotationOrder::EulerXyz,
            1 => RotationOrder::EulerXzy,
            2 => RotationOrder::EulerYzx,
            3 => RotationOrder::EulerYxz,
            4 => RotationOrder::EulerZxy,
            5 => RotationOrder::EulerZyx,
            6 => RotationOrder::SphericXyz,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub shading: String,
    pub props: PropertyTable,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn rotation_order(&self) -> Result<RotationOrder> {
        let code = self.props.get_or::<i64>("RotationOrder", 0)?;
        Ok(RotationOrder::from_code(code).unwrap_or_else(|| {
            log::warn!("unknown rotation order {code} on {}, using XYZ", self.name);
            RotationOrder::EulerXyz
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub shading_model: String,
    pub props: PropertyTable,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub file_name: String,
    pub relative_file_name: String,
    pub uv_translation: Vec2,
    pub uv_scaling: Vec2,
    pub uv_rotation: f32,
    pub props: PropertyTable,
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            name: String::new(),
            file_name: String::new(),
            relative_file_name: String::new(),
            uv_translation: Vec2::ZERO,
            uv_scaling: Vec2::ONE,
            uv_rotation: 0.0,
            props: PropertyTable::new(),
        }
    }
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Translucent = 0,
    Additive = 1,
    Modulate = 2,
    Modulate2 = 3,
    Over = 4,
    Normal = 5,
    Dissolve = 6,
    Darken = 7,
    ColorBurn = 8,
    LinearBurn = 9,
    DarkerColor = 10,
    Lighten = 11,
    Screen = 12,
    ColorDodge = 13,
    LinearDodge = 14,
    LighterColor = 15,
    SoftLight = 16,
    HardLight = 17,
    VividLight = 18,
    LinearLight = 19,
    PinLight = 20,
    HardMix = 21,
    Difference = 22,
    Exclusion = 23,
    Subtract = 24,
    Divide = 25,
    Hue = 26,
    Saturation = 27,
    Color = 28,
    Luminosity = 29,
    Overlay = 30,
}

#[derive(Debug, Clone, Default)]
pub struct LayeredTexture {
    pub name: String,
    pub blend_mode: BlendMode,
    pub alpha: f32,
}

/// Embedded media. The content can be moved out exactly once.
#[derive(Debug, Default)]
pub struct Video {
    pub name: String,
    pub file_name: String,
    pub relative_file_name: String,
    content: RefCell<Option<Vec<u8>>>,
}

impl Video {
    pub fn new(name: &str, file_name: &str, content: Option<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            file_name: file_name.to_string(),
            relative_file_name: String::new(),
            content: RefCell::new(content),
        }
    }

    pub fn content_length(&self) -> usize {
        self.content.borrow().as_ref().map_or(0, Vec::len)
    }

    pub fn relinquish_content(&self) -> Vec<u8> {
        self.content.borrow_mut().take().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    indices: Vec<u32>,
    weights: Vec<f32>,
    pub transform: Mat4,
    pub transform_link: Mat4,
}

impl Cluster {
    pub fn new(name: &str, indices: Vec<u32>, weights: Vec<f32>, transform: Mat4, transform_link: Mat4) -> Result<Self> {
        if indices.len() != weights.len() {
            return Err(ConvertError::MalformedCluster {
                name: name.to_string(),
                indices: indices.len(),
                weights: weights.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            indices,
            weights,
            transform,
            transform_link,
        })
    }

    /// Control point indices influenced by this cluster.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlendShape {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct BlendShapeChannel {
    pub name: String,
    pub deform_percent: f32,
    pub full_weights: Vec<f32>,
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LightType {
    #[default]
    Point = 0,
    Directional = 1,
    Spot = 2,
    Area = 3,
    Volume = 4,
}

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DecayType {
    #[default]
    None = 0,
    Linear = 1,
    Quadratic = 2,
    Cubic = 3,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub decay_type: DecayType,
    pub decay_start: f32,
    pub cast_shadows: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: String::new(),
            light_type: LightType::Point,
            color: Vec3::ONE,
            intensity: 100.0,
            inner_angle: 0.0,
            outer_angle: 45.0,
            decay_type: DecayType::None,
            decay_start: 0.0,
            cast_shadows: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub aspect_width: f32,
    pub aspect_height: f32,
    pub film_width: f32,
    pub focal_length: f32,
    /// Full horizontal angle in degrees, if the file stores it.
    pub field_of_view: Option<f32>,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: String::new(),
            aspect_width: 1.0,
            aspect_height: 1.0,
            film_width: 1.0,
            focal_length: 1.0,
            field_of_view: None,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationStack {
    pub name: String,
    pub local_start: i64,
    pub local_stop: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationLayer {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationCurveNode {
    pub name: String,
}

/// Keys in FBX ticks.
#[derive(Debug, Clone, Default)]
pub struct AnimationCurve {
    pub name: String,
    keys: Vec<i64>,
    values: Vec<f32>,
}

impl AnimationCurve {
    pub fn new(name: &str, keys: Vec<i64>, values: Vec<f32>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(ConvertError::MalformedCurve {
                name: name.to_string(),
                keys: keys.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            keys,
            values,
        })
    }

    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

#[derive(Debug)]
pub enum Object {
    Model(Model),
    MeshGeometry(MeshGeometry),
    LineGeometry(LineGeometry),
    ShapeGeometry(ShapeGeometry),
    Material(Material),
    Texture(Texture),
    LayeredTexture(LayeredTexture),
    Video(Video),
    Skin(Skin),
    Cluster(Cluster),
    BlendShape(BlendShape),
    BlendShapeChannel(BlendShapeChannel),
    Light(Light),
    Camera(Camera),
    Null(String),
    AnimationStack(AnimationStack),
    AnimationLayer(AnimationLayer),
    AnimationCurveNode(AnimationCurveNode),
    AnimationCurve(AnimationCurve),
}

impl Object {
    pub fn name(&self) -> &str {
        match self {
            Object::Model(o) => &o.name,
            Object::MeshGeometry(o) => &o.name,
            Object::LineGeometry(o) => &o.name,
            Object::ShapeGeometry(o) => &o.name,
            Object::Material(o) => &o.name,
            Object::Texture(o) => &o.name,
            Object::LayeredTexture(o) => &o.name,
            Object::Video(o) => &o.name,
            Object::Skin(o) => &o.name,
            Object::Cluster(o) => &o.name,
            Object::BlendShape(o) => &o.name,
            Object::BlendShapeChannel(o) => &o.name,
            Object::Light(o) => &o.name,
            Object::Camera(o) => &o.name,
            Object::Null(name) => name,
            Object::AnimationStack(o) => &o.name,
            Object::AnimationLayer(o) => &o.name,
            Object::AnimationCurveNode(o) => &o.name,
            Object::AnimationCurve(o) => &o.name,
        }
    }

    /// FBX element class used to filter connections.
    pub fn class_name(&self) -> &'static str {
        match self {
            Object::Model(_) => "Model",
            Object::MeshGeometry(_) | Object::LineGeometry(_) | Object::ShapeGeometry(_) => "Geometry",
            Object::Material(_) => "Material",
            Object::Texture(_) => "Texture",
            Object::LayeredTexture(_) => "LayeredTexture",
            Object::Video(_) => "Video",
            Object::Skin(_) | Object::Cluster(_) | Object::BlendShape(_) | Object::BlendShapeChannel(_) => "Deformer",
            Object::Light(_) | Object::Camera(_) | Object::Null(_) => "NodeAttribute",
            Object::AnimationStack(_) => "AnimationStack",
            Object::AnimationLayer(_) => "AnimationLayer",
            Object::AnimationCurveNode(_) => "AnimationCurveNode",
            Object::AnimationCurve(_) => "AnimationCurve",
        }
    }
}
