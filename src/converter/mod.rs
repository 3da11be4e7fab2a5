//! Converts a [`Document`] into a [`Scene`].
//!
//! The conversion runs in a fixed order: animations first, so pivot
//! components with their own channels are known when the node hierarchy
//! is built, then orphaned embedded textures, the node hierarchy with its
//! meshes, lights and cameras, and finally global metadata.

use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Vec3};

use crate::document::{Document, Object, ObjectId};
use crate::error::Result;
use crate::scene::{
    Animation, Camera, EmbeddedTexture, Light, Material, Mesh, Metadata, MetadataValue, Node, Scene, Skeleton,
};
use crate::settings::ImportSettings;

mod animations;
mod attributes;
mod keyframes;
mod materials;
mod meshes;
mod nodes;
pub mod transform_chain;
mod weights;

/// FBX time units per second.
pub const FBX_TICKS_PER_SECOND: f64 = 46_186_158_000.0;

pub(crate) const EPSILON: f32 = 1e-6;

pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / FBX_TICKS_PER_SECOND
}

/// Strips the `Model::` class prefix from a node name.
pub fn fix_node_name(name: &str) -> String {
    name.strip_prefix("Model::").unwrap_or(name).to_string()
}

pub fn convert_to_scene(doc: &Document, settings: &ImportSettings) -> Result<Scene> {
    let mut converter = Converter::new(doc, settings);
    converter.run()?;
    converter.into_scene()
}

pub(crate) struct Converter<'a> {
    doc: &'a Document,
    settings: &'a ImportSettings,
    fps: f64,
    node_names: HashMap<String, u32>,
    /// Transform components animated per node, by fixed node name.
    node_anim_chain_bits: HashMap<String, u32>,
    root: Option<Node>,
    meshes: Vec<Mesh>,
    meshes_converted: BTreeMap<ObjectId, Vec<u32>>,
    materials: Vec<Material>,
    materials_converted: HashMap<ObjectId, u32>,
    default_material: Option<u32>,
    textures: Vec<EmbeddedTexture>,
    textures_converted: HashMap<ObjectId, u32>,
    animations: Vec<Animation>,
    lights: Vec<Light>,
    cameras: Vec<Camera>,
    skeletons: Vec<Skeleton>,
    metadata: Metadata,
}

impl<'a> Converter<'a> {
    fn new(doc: &'a Document, settings: &'a ImportSettings) -> Self {
        let global = &doc.global_settings;
        Self {
            doc,
            settings,
            fps: global.time_mode.frames_per_second(global.custom_frame_rate),
            node_names: HashMap::new(),
            node_anim_chain_bits: HashMap::new(),
            root: None,
            meshes: vec![],
            meshes_converted: BTreeMap::new(),
            materials: vec![],
            materials_converted: HashMap::new(),
            default_material: None,
            textures: vec![],
            textures_converted: HashMap::new(),
            animations: vec![],
            lights: vec![],
            cameras: vec![],
            skeletons: vec![],
            metadata: Metadata::new(),
        }
    }

    fn run(&mut self) -> Result<()> {
        if self.settings.read_animations {
            self.convert_animations()?;
        }
        if self.settings.read_textures {
            self.convert_orphaned_embedded_textures();
        }

        let root_name = self.unique_name("RootNode");
        let mut root = Node::new(root_name.as_str(), Mat4::IDENTITY);
        root.children = self.convert_nodes(ObjectId::ROOT, &root_name, Mat4::IDENTITY, &mut vec![])?;
        self.root = Some(root);

        if self.settings.read_all_materials {
            self.convert_unreferenced_materials()?;
        }
        self.convert_global_settings();
        Ok(())
    }

    /// Returns `name`, or `name` with the lowest free three-digit suffix.
    fn unique_name(&mut self, name: &str) -> String {
        let Some(count) = self.node_names.get_mut(name) else {
            self.node_names.insert(name.to_string(), 0);
            return name.to_string();
        };
        let mut i = *count;
        loop {
            i += 1;
            let candidate = format!("{name}{i:03}");
            if !self.node_names.contains_key(&candidate) {
                if let Some(count) = self.node_names.get_mut(name) {
                    *count = i;
                }
                self.node_names.insert(candidate.clone(), 0);
                return candidate;
            }
        }
    }

    fn convert_orphaned_embedded_textures(&mut self) {
        let doc = self.doc;
        for (id, object) in doc.objects() {
            if !matches!(object, Object::Texture(_)) || doc.has_outgoing_connections(id) {
                continue;
            }
            let Some((video_id, video)) = doc.texture_media(id) else {
                continue;
            };
            if video.content_length() > 0 && !self.textures_converted.contains_key(&video_id) {
                self.convert_video(video_id, video);
            }
        }
    }

    fn convert_unreferenced_materials(&mut self) -> Result<()> {
        let doc = self.doc;
        for (id, object) in doc.objects() {
            let Object::Material(material) = object else {
                continue;
            };
            if !self.materials_converted.contains_key(&id) {
                self.convert_material(id, material, None)?;
            }
        }
        Ok(())
    }

    fn convert_global_settings(&mut self) {
        let doc = self.doc;
        let global = &doc.global_settings;
        let ints = [
            ("UpAxis", global.up_axis),
            ("UpAxisSign", global.up_axis_sign),
            ("FrontAxis", global.front_axis),
            ("FrontAxisSign", global.front_axis_sign),
            ("CoordAxis", global.coord_axis),
            ("CoordAxisSign", global.coord_axis_sign),
            ("OriginalUpAxis", global.original_up_axis),
            ("OriginalUpAxisSign", global.original_up_axis_sign),
            ("FrameRate", global.time_mode as i32),
        ];
        for (key, value) in ints {
            self.metadata.insert(key.to_string(), MetadataValue::Int(value));
        }

        let mut set = |key: &str, value: MetadataValue| {
            self.metadata.insert(key.to_string(), value);
        };
        set("UnitScaleFactor", MetadataValue::Double(global.unit_scale_factor));
        set("OriginalUnitScaleFactor", MetadataValue::Double(global.original_unit_scale_factor));
        set("AmbientColor", MetadataValue::Vec3(global.ambient_color));
        set("TimeSpanStart", MetadataValue::Int64(global.time_span_start));
        set("TimeSpanStop", MetadataValue::Int64(global.time_span_stop));
        set("CustomFrameRate", MetadataValue::Float(global.custom_frame_rate));
        set("SourceAsset_FormatVersion", MetadataValue::String(doc.version.to_string()));
        if !doc.creator.is_empty() {
            set("SourceAsset_Generator", MetadataValue::String(doc.creator.clone()));
        }
    }

    /// Maps the file's axis system and unit scale onto the output's.
    fn root_correction(&self) -> Mat4 {
        let global = &self.doc.global_settings;
        let unit = global.unit_scale_factor as f32;
        let axis = |index: i32, sign: i32| {
            let mut v = Vec3::ZERO;
            if let Ok(index) = usize::try_from(index) {
                if index < 3 {
                    v[index] = sign as f32 * unit;
                }
            }
            v
        };
        let right = axis(global.coord_axis, global.coord_axis_sign);
        let up = axis(global.up_axis, global.up_axis_sign);
        let forward = axis(global.front_axis, global.front_axis_sign);
        Mat4::from_cols(right.extend(0.0), up.extend(0.0), forward.extend(0.0), glam::Vec4::W).transpose()
    }

    fn into_scene(self) -> Result<Scene> {
        let correction = self.root_correction();
        let mut root = self.root.unwrap_or_else(|| Node::new("RootNode", Mat4::IDENTITY));
        let incomplete = self.meshes.is_empty();
        if incomplete {
            log::warn!("no meshes converted, marking scene incomplete");
        } else if !self.settings.ignore_up_direction {
            root.transform *= correction;
        }

        Ok(Scene {
            root,
            meshes: self.meshes,
            materials: self.materials,
            animations: self.animations,
            lights: self.lights,
            cameras: self.cameras,
            textures: self.textures,
            skeletons: self.skeletons,
            metadata: self.metadata,
            incomplete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_get_numbered_suffixes() {
        let doc = Document::new();
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        assert_eq!(converter.unique_name("Box"), "Box");
        assert_eq!(converter.unique_name("Box"), "Box001");
        assert_eq!(converter.unique_name("Box001"), "Box001001");
        assert_eq!(converter.unique_name("Box"), "Box002");
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        let doc = Document::new();
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        converter.unique_name("Box001");
        converter.unique_name("Box");
        assert_eq!(converter.unique_name("Box"), "Box002");
    }

    #[test]
    fn y_up_centimeters_scale_the_root() {
        let mut doc = Document::new();
        doc.global_settings.up_axis = 1;
        doc.global_settings.up_axis_sign = 1;
        doc.global_settings.front_axis = 2;
        doc.global_settings.front_axis_sign = 1;
        doc.global_settings.coord_axis = 0;
        doc.global_settings.coord_axis_sign = 1;
        doc.global_settings.unit_scale_factor = 2.0;
        let settings = ImportSettings::default();
        let converter = Converter::new(&doc, &settings);
        assert!(converter
            .root_correction()
            .abs_diff_eq(Mat4::from_scale(Vec3::splat(2.0)), 1e-6));
    }

    #[test]
    fn z_up_maps_to_y() {
        let mut doc = Document::new();
        doc.global_settings.up_axis = 2;
        doc.global_settings.up_axis_sign = 1;
        doc.global_settings.front_axis = 1;
        doc.global_settings.front_axis_sign = -1;
        doc.global_settings.coord_axis = 0;
        doc.global_settings.coord_axis_sign = 1;
        doc.global_settings.unit_scale_factor = 1.0;
        let settings = ImportSettings::default();
        let converter = Converter::new(&doc, &settings);
        let z_up = Vec3::Z;
        let mapped = converter.root_correction().transform_vector3(z_up);
        assert!(mapped.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn empty_document_is_incomplete() {
        let doc = Document::new();
        let scene = convert_to_scene(&doc, &ImportSettings::default()).unwrap();
        assert!(scene.incomplete);
        assert_eq!(scene.root.name, "RootNode");
        assert_eq!(
            scene.metadata.get("SourceAsset_FormatVersion"),
            Some(&MetadataValue::String("7400".to_string()))
        );
        assert!(!scene.metadata.contains_key("SourceAsset_Generator"));
    }
}
