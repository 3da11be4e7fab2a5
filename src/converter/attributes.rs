use glam::Vec3;

use crate::document::{self, DecayType, LightType, Object, ObjectId};
use crate::scene::{Camera, Light, LightSourceType};

use super::Converter;

fn convert_light(light: &document::Light, name: &str) -> Light {
    let color = light.color * light.intensity / 100.0;
    let mut out = Light {
        name: name.to_string(),
        light_type: LightSourceType::Undefined,
        position: Vec3::ZERO,
        direction: Vec3::new(0.0, -1.0, 0.0),
        up: Vec3::new(0.0, 0.0, -1.0),
        color_diffuse: color,
        color_specular: color,
        attenuation_constant: 0.0,
        attenuation_linear: 0.0,
        attenuation_quadratic: 0.0,
        angle_inner_cone: 0.0,
        angle_outer_cone: 0.0,
    };

    match light.light_type {
        LightType::Point => out.light_type = LightSourceType::Point,
        LightType::Directional => out.light_type = LightSourceType::Directional,
        LightType::Spot => {
            out.light_type = LightSourceType::Spot;
            out.angle_inner_cone = light.inner_angle.to_radians();
            out.angle_outer_cone = light.outer_angle.to_radians();
        }
        LightType::Area | LightType::Volume => {
            log::warn!("unsupported light type {:?} on {name}, setting to undefined", light.light_type);
        }
    }

    let decay = light.decay_start;
    match light.decay_type {
        DecayType::None => out.attenuation_constant = decay,
        DecayType::Linear => out.attenuation_linear = 2.0 / decay,
        DecayType::Quadratic => out.attenuation_quadratic = 2.0 / (decay * decay),
        DecayType::Cubic => {
            log::warn!("cubic light attenuation on {name} is not supported, using quadratic");
            out.attenuation_quadratic = 1.0;
        }
    }
    out
}

fn convert_camera(camera: &document::Camera, name: &str) -> Camera {
    let horizontal_fov = match camera.field_of_view {
        Some(degrees) => degrees.to_radians() * 0.5,
        None => (camera.film_width * 25.4 * 0.5).atan2(camera.focal_length),
    };
    Camera {
        name: name.to_string(),
        position: Vec3::ZERO,
        look_at: Vec3::X,
        up: Vec3::Y,
        horizontal_fov,
        aspect: camera.aspect_width / camera.aspect_height,
        clip_plane_near: camera.near_plane,
        clip_plane_far: camera.far_plane,
    }
}

impl Converter<'_> {
    /// Lights and cameras attached to a model, named after its node.
    pub(super) fn convert_model_attributes(&mut self, model_id: ObjectId, node_name: &str) {
        let doc = self.doc;
        for (_, attribute) in doc.model_attributes(model_id) {
            match attribute {
                Object::Light(light) if self.settings.read_lights => self.lights.push(convert_light(light, node_name)),
                Object::Camera(camera) if self.settings.read_cameras => {
                    self.cameras.push(convert_camera(camera, node_name))
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_angles_and_decay() {
        let light = document::Light {
            light_type: LightType::Spot,
            color: Vec3::new(1.0, 0.5, 0.0),
            intensity: 50.0,
            inner_angle: 30.0,
            outer_angle: 60.0,
            decay_type: DecayType::Quadratic,
            decay_start: 2.0,
            ..Default::default()
        };
        let out = convert_light(&light, "Lamp");
        assert_eq!(out.light_type, LightSourceType::Spot);
        assert_eq!(out.color_diffuse, Vec3::new(0.5, 0.25, 0.0));
        assert!((out.angle_outer_cone - std::f32::consts::FRAC_PI_3).abs() < 1e-6);
        assert_eq!(out.attenuation_quadratic, 0.5);
        assert_eq!(out.attenuation_constant, 0.0);
    }

    #[test]
    fn spot_cones_fall_back_to_template_angles() {
        let light = document::Light {
            light_type: LightType::Spot,
            ..Default::default()
        };
        let out = convert_light(&light, "Lamp");
        assert_eq!(out.angle_inner_cone, 0.0);
        assert!((out.angle_outer_cone - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn area_lights_are_undefined() {
        let light = document::Light {
            light_type: LightType::Area,
            decay_type: DecayType::Cubic,
            ..Default::default()
        };
        let out = convert_light(&light, "Panel");
        assert_eq!(out.light_type, LightSourceType::Undefined);
        assert_eq!(out.attenuation_quadratic, 1.0);
    }

    #[test]
    fn camera_fov_from_field_of_view_or_film() {
        let camera = document::Camera {
            field_of_view: Some(90.0),
            aspect_width: 16.0,
            aspect_height: 9.0,
            ..Default::default()
        };
        let out = convert_camera(&camera, "Cam");
        assert!((out.horizontal_fov - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!((out.aspect - 16.0 / 9.0).abs() < 1e-6);

        let camera = document::Camera {
            film_width: 1.0,
            focal_length: 12.7,
            ..Default::default()
        };
        let out = convert_camera(&camera, "Cam");
        assert!((out.horizontal_fov - std::f32::consts::FRAC_PI_4).abs() < 1e-5);
    }
}
