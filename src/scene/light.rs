use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightSourceType {
    Undefined,
    Directional,
    Point,
    Spot,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Light {
    /// Name of the node the light hangs off.
    pub name: String,
    pub light_type: LightSourceType,
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub color_diffuse: Vec3,
    pub color_specular: Vec3,
    pub attenuation_constant: f32,
    pub attenuation_linear: f32,
    pub attenuation_quadratic: f32,
    /// Radians.
    pub angle_inner_cone: f32,
    pub angle_outer_cone: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Half angle, radians.
    pub horizontal_fov: f32,
    pub aspect: f32,
    pub clip_plane_near: f32,
    pub clip_plane_far: f32,
}
