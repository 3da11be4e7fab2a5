use glam::Vec3;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FrameRate {
    #[default]
    Default = 0,
    Fps120 = 1,
    Fps100 = 2,
    Fps60 = 3,
    Fps50 = 4,
    Fps48 = 5,
    Fps30 = 6,
    Fps30Drop = 7,
    NtscDropFrame = 8,
    NtscFullFrame = 9,
    Pal = 10,
    Cinema = 11,
    Fps1000 = 12,
    CinemaNd = 13,
    Custom = 14,
}

impl FrameRate {
    pub fn frames_per_second(self, custom: f32) -> f64 {
        match self {
            FrameRate::Default => 1.0,
            FrameRate::Fps120 => 120.0,
            FrameRate::Fps100 => 100.0,
            FrameRate::Fps60 => 60.0,
            FrameRate::Fps50 => 50.0,
            FrameRate::Fps48 => 48.0,
            FrameRate::Fps30 | FrameRate::Fps30Drop => 30.0,
            FrameRate::NtscDropFrame | FrameRate::NtscFullFrame => 29.9700262,
            FrameRate::Pal => 25.0,
            FrameRate::Cinema => 24.0,
            FrameRate::Fps1000 => 1000.0,
            FrameRate::CinemaNd => 23.976,
            FrameRate::Custom => custom as f64,
        }
    }
}

/// Document-level axis, unit and time settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    pub up_axis: i32,
    pub up_axis_sign: i32,
    pub front_axis: i32,
    pub front_axis_sign: i32,
    pub coord_axis: i32,
    pub coord_axis_sign: i32,
    pub original_up_axis: i32,
    pub original_up_axis_sign: i32,
    pub unit_scale_factor: f64,
    pub original_unit_scale_factor: f64,
    pub ambient_color: Vec3,
    pub time_mode: FrameRate,
    pub time_span_start: i64,
    pub time_span_stop: i64,
    pub custom_frame_rate: f32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            up_axis: 1,
            up_axis_sign: 1,
            front_axis: 2,
            front_axis_sign: 1,
            coord_axis: 0,
            coord_axis_sign: 1,
            original_up_axis: 0,
            original_up_axis_sign: 1,
            unit_scale_factor: 1.0,
            original_unit_scale_factor: 1.0,
            ambient_color: Vec3::ZERO,
            time_mode: FrameRate::Default,
            time_span_start: 0,
            time_span_stop: 0,
            custom_frame_rate: -1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_rate_uses_override() {
        assert_eq!(FrameRate::Custom.frames_per_second(12.5), 12.5);
        assert_eq!(FrameRate::Fps30Drop.frames_per_second(12.5), 30.0);
    }

    #[test]
    fn frame_rate_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&FrameRate::Pal).unwrap(), "10");
    }
}
