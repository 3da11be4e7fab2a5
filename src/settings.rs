use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ImportSettings {
    pub read_materials: bool,
    /// Convert materials no mesh references.
    pub read_all_materials: bool,
    pub read_textures: bool,
    pub read_cameras: bool,
    pub read_lights: bool,
    pub read_animations: bool,
    pub read_weights: bool,
    /// Keep pivots and offsets as separate helper nodes instead of baking them.
    pub preserve_pivots: bool,
    pub optimize_empty_animation_curves: bool,
    /// Reference embedded textures as `*index` instead of by file name.
    pub use_legacy_embedded_texture_naming: bool,
    pub use_skeleton: bool,
    pub remove_empty_bones: bool,
    pub ignore_up_direction: bool,
    pub max_node_depth: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            read_materials: true,
            read_all_materials: false,
            read_textures: true,
            read_cameras: true,
            read_lights: true,
            read_animations: true,
            read_weights: true,
            preserve_pivots: true,
            optimize_empty_animation_curves: true,
            use_legacy_embedded_texture_naming: false,
            use_skeleton: false,
            remove_empty_bones: true,
            ignore_up_direction: false,
            max_node_depth: 1024,
        }
    }
}

impl ImportSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = ImportSettings::from_json(r#"{ "preserve_pivots": false }"#).unwrap();
        assert!(!settings.preserve_pivots);
        assert!(settings.read_materials);
        assert_eq!(settings.max_node_depth, 1024);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ImportSettings::from_json("{ read_weights: ").is_err());
    }
}
