use std::collections::BTreeMap;

use glam::Vec3;

use crate::document::{LayeredTexture, Material, MeshGeometry, ObjectId, PropertyTable, PropertyValue, Texture, Video};
use crate::error::Result;
use crate::scene::material::keys;
use crate::scene::{
    EmbeddedTexture, Material as OutMaterial, MaterialProperty, ShadingMode, TextureSlot, TextureType, UvTransform,
    DEFAULT_MATERIAL_NAME,
};

use super::Converter;

use TextureType as T;

/// Material properties that hold a single texture, in assignment order.
const TEXTURE_SLOTS: [(&str, TextureType); 39] = [
    ("DiffuseColor", T::Diffuse),
    ("AmbientColor", T::Ambient),
    ("EmissiveColor", T::Emissive),
    ("SpecularColor", T::Specular),
    ("SpecularFactor", T::Specular),
    ("TransparentColor", T::Opacity),
    ("ReflectionColor", T::Reflection),
    ("DisplacementColor", T::Displacement),
    ("NormalMap", T::Normals),
    ("Bump", T::Height),
    ("ShininessExponent", T::Shininess),
    ("TransparencyFactor", T::Opacity),
    ("EmissiveFactor", T::Emissive),
    ("ReflectionFactor", T::Metalness),
    ("Maya|DiffuseTexture", T::Diffuse),
    ("Maya|NormalTexture", T::Normals),
    ("Maya|SpecularTexture", T::Specular),
    ("Maya|FalloffTexture", T::Opacity),
    ("Maya|ReflectionMapTexture", T::Reflection),
    ("Maya|baseColor", T::BaseColor),
    ("Maya|normalCamera", T::NormalCamera),
    ("Maya|emissionColor", T::EmissionColor),
    ("Maya|metalness", T::Metalness),
    ("Maya|diffuseRoughness", T::DiffuseRoughness),
    ("Maya|base", T::MayaBase),
    ("Maya|specular", T::MayaSpecular),
    ("Maya|specularColor", T::MayaSpecularColor),
    ("Maya|specularRoughness", T::MayaSpecularRoughness),
    ("Maya|TEX_color_map", T::BaseColor),
    ("Maya|TEX_normal_map", T::NormalCamera),
    ("Maya|TEX_emissive_map", T::EmissionColor),
    ("Maya|TEX_metallic_map", T::Metalness),
    ("Maya|TEX_roughness_map", T::DiffuseRoughness),
    ("Maya|TEX_ao_map", T::AmbientOcclusion),
    ("3dsMax|Parameters|base_color_map", T::BaseColor),
    ("3dsMax|Parameters|bump_map", T::NormalCamera),
    ("3dsMax|Parameters|emission_map", T::EmissionColor),
    ("3dsMax|Parameters|metalness_map", T::Metalness),
    ("3dsMax|Parameters|roughness_map", T::DiffuseRoughness),
];

const MAX_MAIN_SLOTS: [(&str, TextureType); 7] = [
    ("3dsMax|main|base_color_map", T::BaseColor),
    ("3dsMax|main|norm_map", T::NormalCamera),
    ("3dsMax|main|emit_color_map", T::EmissionColor),
    ("3dsMax|main|ao_map", T::AmbientOcclusion),
    ("3dsMax|main|opacity_map", T::Opacity),
    ("3dsMax|main|metalness_map", T::Metalness),
    ("3dsMax|main|specular_map", T::Specular),
];

const LAYERED_TEXTURE_SLOTS: [(&str, TextureType); 14] = [
    ("DiffuseColor", T::Diffuse),
    ("AmbientColor", T::Ambient),
    ("EmissiveColor", T::Emissive),
    ("SpecularColor", T::Specular),
    ("SpecularFactor", T::Specular),
    ("TransparentColor", T::Opacity),
    ("ReflectionColor", T::Reflection),
    ("DisplacementColor", T::Displacement),
    ("NormalMap", T::Normals),
    ("Bump", T::Height),
    ("ShininessExponent", T::Shininess),
    ("EmissiveFactor", T::Emissive),
    ("TransparencyFactor", T::Opacity),
    ("ReflectionFactor", T::Metalness),
];

fn uv_transform(texture: &Texture) -> UvTransform {
    UvTransform {
        translation: texture.uv_translation,
        scaling: texture.uv_scaling,
        rotation: texture.uv_rotation,
    }
}

/// `{name}Color` scaled by `{name}Factor` when the factor is present.
fn factored_color(props: &PropertyTable, color: &str, factor: &str, template: bool) -> Result<Option<Vec3>> {
    let (color, factor) = if template {
        (props.get_or_template::<Vec3>(color)?, props.get_or_template::<f32>(factor)?)
    } else {
        (props.get::<Vec3>(color)?, props.get::<f32>(factor)?)
    };
    Ok(color.map(|c| c * factor.unwrap_or(1.0)))
}

fn set_shading_properties_common(out: &mut OutMaterial, props: &PropertyTable) -> Result<()> {
    if let Some(diffuse) = factored_color(props, "DiffuseColor", "DiffuseFactor", true)? {
        out.set(keys::COLOR_DIFFUSE, MaterialProperty::Color(diffuse));
    }
    let emissive = match factored_color(props, "EmissiveColor", "EmissiveFactor", true)? {
        Some(emissive) => Some(emissive),
        None => props.get::<Vec3>("Maya|emissive")?,
    };
    if let Some(emissive) = emissive {
        out.set(keys::COLOR_EMISSIVE, MaterialProperty::Color(emissive));
    }
    if let Some(ambient) = factored_color(props, "AmbientColor", "AmbientFactor", true)? {
        out.set(keys::COLOR_AMBIENT, MaterialProperty::Color(ambient));
    }

    if let Some(specular) = props.get_or_template::<Vec3>("SpecularColor")? {
        out.set(keys::COLOR_SPECULAR, MaterialProperty::Color(specular));
    }
    if let Some(strength) = props.get_or_template::<f32>("SpecularFactor")? {
        out.set(keys::SHININESS_STRENGTH, MaterialProperty::Float(strength));
    }
    if let Some(exponent) = props.get::<f32>("ShininessExponent")? {
        out.set(keys::SHININESS, MaterialProperty::Float(exponent));
        out.set(keys::ROUGHNESS_FACTOR, MaterialProperty::Float(1.0 - exponent.sqrt() / 10.0));
    }

    let mut calculated_opacity = 1.0;
    if let Some(transparent) = factored_color(props, "TransparentColor", "TransparencyFactor", false)? {
        out.set(keys::COLOR_TRANSPARENT, MaterialProperty::Color(transparent));
        calculated_opacity = 1.0 - transparent.element_sum() / 3.0;
    }
    if let Some(factor) = props.get::<f32>("TransparencyFactor")? {
        out.set(keys::TRANSPARENCY_FACTOR, MaterialProperty::Float(factor));
    }
    match props.get::<f32>("Opacity")? {
        Some(opacity) => out.set(keys::OPACITY, MaterialProperty::Float(opacity)),
        None if calculated_opacity != 1.0 => out.set(keys::OPACITY, MaterialProperty::Float(calculated_opacity)),
        None => {}
    }

    if let Some(reflection) = props.get_or_template::<Vec3>("ReflectionColor")? {
        out.set(keys::COLOR_REFLECTIVE, MaterialProperty::Color(reflection));
    }
    if let Some(reflectivity) = props.get_or_template::<f32>("ReflectionFactor")? {
        out.set(keys::REFLECTIVITY, MaterialProperty::Float(reflectivity));
    }

    let floats = [
        ("BumpFactor", keys::BUMP_SCALING),
        ("DisplacementFactor", keys::DISPLACEMENT_SCALING),
        ("Maya|use_color_map", keys::USE_COLOR_MAP),
        ("Maya|use_metallic_map", keys::USE_METALLIC_MAP),
        ("Maya|metallic", keys::METALLIC_FACTOR),
        ("Maya|use_roughness_map", keys::USE_ROUGHNESS_MAP),
        ("Maya|roughness", keys::ROUGHNESS_FACTOR),
        ("Maya|use_emissive_map", keys::USE_EMISSIVE_MAP),
        ("Maya|emissive_intensity", keys::EMISSIVE_INTENSITY),
        ("Maya|use_ao_map", keys::USE_AO_MAP),
    ];
    if let Some(base_color) = props.get::<Vec3>("Maya|base_color")? {
        out.set(keys::BASE_COLOR, MaterialProperty::Color(base_color));
    }
    for (name, key) in floats {
        if let Some(value) = props.get::<f32>(name)? {
            out.set(key, MaterialProperty::Float(value));
        }
    }
    Ok(())
}

fn raw_key(name: &str) -> String {
    format!("{}{name}", keys::RAW_PREFIX)
}

fn file_extension_hint(file_name: &str) -> String {
    let extension = match file_name.rfind('.') {
        Some(i) => file_name[i + 1..].to_lowercase(),
        None => String::new(),
    };
    let extension = if extension == "jpeg" { "jpg".to_string() } else { extension };
    if extension.len() <= 3 {
        extension
    } else {
        String::new()
    }
}

impl Converter<'_> {
    pub(super) fn default_material_index(&mut self) -> u32 {
        if let Some(index) = self.default_material {
            return index;
        }
        let mut material = OutMaterial::default();
        material.set(keys::NAME, MaterialProperty::String(DEFAULT_MATERIAL_NAME.to_string()));
        material.set(keys::COLOR_DIFFUSE, MaterialProperty::Color(Vec3::splat(0.8)));
        let index = self.materials.len() as u32;
        self.materials.push(material);
        self.default_material = Some(index);
        index
    }

    /// Material `index` of the model, converting it on first use.
    pub(super) fn convert_material_for_mesh(&mut self, model_id: ObjectId, mesh: &MeshGeometry, index: i32) -> Result<u32> {
        let doc = self.doc;
        let materials = doc.model_materials(model_id);
        let Some(&(material_id, material)) = usize::try_from(index).ok().and_then(|i| materials.get(i)) else {
            log::error!("material index out of bounds, setting default material");
            return Ok(self.default_material_index());
        };
        if let Some(&converted) = self.materials_converted.get(&material_id) {
            return Ok(converted);
        }
        self.convert_material(material_id, material, Some(mesh))
    }

    pub(super) fn convert_material(&mut self, id: ObjectId, material: &Material, mesh: Option<&MeshGeometry>) -> Result<u32> {
        let doc = self.doc;
        let props = &material.props;
        let mut out = OutMaterial::default();

        let name = material.name.strip_prefix("Material::").unwrap_or(&material.name);
        if !name.is_empty() {
            out.set(keys::NAME, MaterialProperty::String(name.to_string()));
        }
        let shading = match material.shading_model.to_ascii_lowercase().as_str() {
            "phong" => Some(ShadingMode::Phong),
            "lambert" => Some(ShadingMode::Gouraud),
            _ => None,
        };
        if let Some(shading) = shading {
            out.set(keys::SHADING_MODEL, MaterialProperty::Shading(shading));
        }

        let textures = doc.material_textures(id);
        set_shading_properties_common(&mut out, props)?;
        self.set_shading_properties_raw(&mut out, props, &textures, id, mesh)?;
        self.set_texture_properties(&mut out, &textures, id, mesh)?;
        self.set_layered_texture_properties(&mut out, &doc.material_layered_textures(id), id, mesh)?;

        let index = self.materials.len() as u32;
        self.materials.push(out);
        self.materials_converted.insert(id, index);
        Ok(index)
    }

    /// Passes every property set on the material through under `$raw.`,
    /// along with the file, UV transform and UV channel of bound textures.
    fn set_shading_properties_raw(
        &mut self,
        out: &mut OutMaterial,
        props: &PropertyTable,
        textures: &BTreeMap<String, (ObjectId, &Texture)>,
        material_id: ObjectId,
        mesh: Option<&MeshGeometry>,
    ) -> Result<()> {
        for (name, value) in props.direct_properties() {
            let value = match value {
                PropertyValue::Vec3(v) => MaterialProperty::Color(*v),
                PropertyValue::Float(f) => MaterialProperty::Float(*f),
                PropertyValue::Int(i) => MaterialProperty::Int(*i as i32),
                PropertyValue::Bool(b) => MaterialProperty::Int(*b as i32),
                PropertyValue::String(s) => MaterialProperty::String(s.clone()),
            };
            out.set(&raw_key(name), value);
        }

        let doc = self.doc;
        for (property, &(texture_id, texture)) in textures {
            let mut path = texture.relative_file_name.clone();
            if let Some((video_id, video)) = doc.texture_media(texture_id) {
                let index = match self.textures_converted.get(&video_id) {
                    Some(&index) => Some(index),
                    None if video.content_length() > 0 => Some(self.convert_video(video_id, video)),
                    None => None,
                };
                if let Some(index) = index {
                    path = format!("*{index}");
                }
            }
            out.set(&raw_key(&format!("{property}|file")), MaterialProperty::String(path));
            out.set(
                &raw_key(&format!("{property}|uvtrafo")),
                MaterialProperty::UvTransform(uv_transform(texture)),
            );
            let uv_index = self.resolve_uv_index(texture, material_id, mesh)?;
            out.set(&raw_key(&format!("{property}|uvwsrc")), MaterialProperty::Int(uv_index as i32));
        }
        Ok(())
    }

    fn texture_slot(
        &mut self,
        texture_type: TextureType,
        index: u32,
        texture_id: ObjectId,
        texture: &Texture,
        material_id: ObjectId,
        mesh: Option<&MeshGeometry>,
    ) -> Result<TextureSlot> {
        Ok(TextureSlot {
            texture_type,
            index,
            path: self.texture_path(texture_id, texture),
            uv_transform: uv_transform(texture),
            uv_index: self.resolve_uv_index(texture, material_id, mesh)?,
            blend_mode: None,
        })
    }

    fn set_texture_properties(
        &mut self,
        out: &mut OutMaterial,
        textures: &BTreeMap<String, (ObjectId, &Texture)>,
        material_id: ObjectId,
        mesh: Option<&MeshGeometry>,
    ) -> Result<()> {
        let assign = |this: &mut Self, out: &mut OutMaterial, property: &str, texture_type| -> Result<()> {
            if let Some(&(texture_id, texture)) = textures.get(property) {
                let slot = this.texture_slot(texture_type, 0, texture_id, texture, material_id, mesh)?;
                out.textures.retain(|t| !(t.texture_type == texture_type && t.index == 0));
                out.textures.push(slot);
            }
            Ok(())
        };

        for (property, texture_type) in TEXTURE_SLOTS.into_iter().chain(MAX_MAIN_SLOTS) {
            assign(self, out, property, texture_type)?;
        }

        // 3ds Max swaps the meaning of these maps with its glossiness switch.
        if let Some(use_glossiness) = out.int(&raw_key("3dsMax|main|useGlossiness")) {
            let texture_type = match use_glossiness {
                1 => Some(T::Shininess),
                2 => Some(T::DiffuseRoughness),
                _ => {
                    log::warn!("3dsMax PBR material without a useGlossiness value, ignoring roughness and glossiness maps");
                    None
                }
            };
            if let Some(texture_type) = texture_type {
                assign(self, out, "3dsMax|main|roughness_map", texture_type)?;
                assign(self, out, "3dsMax|main|glossiness_map", texture_type)?;
            }
        }
        Ok(())
    }

    fn set_layered_texture_properties(
        &mut self,
        out: &mut OutMaterial,
        layered: &BTreeMap<String, (ObjectId, &LayeredTexture)>,
        material_id: ObjectId,
        mesh: Option<&MeshGeometry>,
    ) -> Result<()> {
        let doc = self.doc;
        for (property, texture_type) in LAYERED_TEXTURE_SLOTS {
            let Some(&(layered_id, layered_texture)) = layered.get(property) else {
                continue;
            };
            out.textures.retain(|t| t.texture_type != texture_type);
            for (index, (texture_id, texture)) in doc.layered_texture_layers(layered_id).into_iter().enumerate() {
                let mut slot = self.texture_slot(texture_type, index as u32, texture_id, texture, material_id, mesh)?;
                slot.blend_mode = Some(layered_texture.blend_mode as i32);
                out.textures.push(slot);
            }
        }
        Ok(())
    }

    /// File name of a texture, or `*{index}` for embedded data with legacy naming.
    fn texture_path(&mut self, texture_id: ObjectId, texture: &Texture) -> String {
        let doc = self.doc;
        let path = texture.relative_file_name.clone();
        let Some((video_id, video)) = doc.texture_media(texture_id) else {
            return path;
        };
        let index = match self.textures_converted.get(&video_id) {
            Some(&index) => Some(index),
            None if video.content_length() > 0 => Some(self.convert_video(video_id, video)),
            None => None,
        };
        match index {
            Some(index) if self.settings.use_legacy_embedded_texture_naming => format!("*{index}"),
            _ => path,
        }
    }

    /// Index of the UV channel named by the texture's `UVSet`. Without a
    /// mesh, every converted mesh using the material is searched.
    fn resolve_uv_index(&self, texture: &Texture, material_id: ObjectId, mesh: Option<&MeshGeometry>) -> Result<u32> {
        let uv_set = match texture.props.get::<String>("UVSet")? {
            Some(uv_set) if uv_set != "default" && !uv_set.is_empty() => uv_set,
            _ => return Ok(0),
        };
        let find = |mesh: &MeshGeometry| {
            let index = mesh.uv_channels().iter().position(|c| c.name == uv_set);
            if index.is_none() {
                log::warn!("did not find UV channel named {uv_set} in a mesh using this material");
            }
            index
        };

        let doc = self.doc;
        let mut resolved = None;
        match mesh {
            Some(mesh) => resolved = find(mesh),
            None => {
                for &geometry_id in self.meshes_converted.keys() {
                    let Some(geometry) = doc.mesh_geometry(geometry_id) else {
                        continue;
                    };
                    let uses_material = doc.geometry_models(geometry_id).iter().any(|(model_id, _)| {
                        doc.model_materials(*model_id).iter().any(|(id, _)| *id == material_id)
                    });
                    if !uses_material {
                        continue;
                    }
                    let Some(index) = find(geometry) else {
                        continue;
                    };
                    match resolved {
                        None => resolved = Some(index),
                        Some(previous) if previous != index => log::warn!(
                            "the UV channel named {uv_set} appears at different positions in meshes, results will be wrong"
                        ),
                        Some(_) => {}
                    }
                }
            }
        }

        Ok(match resolved {
            Some(index) => index as u32,
            None => {
                log::warn!("failed to resolve UV channel {uv_set}, using first UV channel");
                0
            }
        })
    }

    /// Moves embedded video data into a scene texture.
    pub(super) fn convert_video(&mut self, video_id: ObjectId, video: &Video) -> u32 {
        let file_name = if video.relative_file_name.is_empty() {
            &video.file_name
        } else {
            &video.relative_file_name
        };
        let texture = EmbeddedTexture {
            data: video.relinquish_content(),
            format_hint: file_extension_hint(file_name),
            file_name: file_name.clone(),
        };
        let index = self.textures.len() as u32;
        self.textures.push(texture);
        self.textures_converted.insert(video_id, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Object};
    use crate::settings::ImportSettings;

    #[test]
    fn extension_hints_are_short_and_lowercase() {
        assert_eq!(file_extension_hint("tex/Wood.JPEG"), "jpg");
        assert_eq!(file_extension_hint("a.png"), "png");
        assert_eq!(file_extension_hint("a.tiff"), "");
        assert_eq!(file_extension_hint("noext"), "");
    }

    #[test]
    fn opacity_falls_back_to_transparency() {
        let mut props = PropertyTable::new();
        props
            .set("TransparentColor", PropertyValue::Vec3(Vec3::splat(0.4)))
            .set("TransparencyFactor", PropertyValue::Float(0.5));
        let mut out = OutMaterial::default();
        set_shading_properties_common(&mut out, &props).unwrap();
        assert_eq!(out.color(keys::COLOR_TRANSPARENT), Some(Vec3::splat(0.2)));
        assert!((out.float(keys::OPACITY).unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(out.float(keys::TRANSPARENCY_FACTOR), Some(0.5));

        props.set("Opacity", PropertyValue::Float(0.25));
        let mut out = OutMaterial::default();
        set_shading_properties_common(&mut out, &props).unwrap();
        assert_eq!(out.float(keys::OPACITY), Some(0.25));
    }

    #[test]
    fn maya_roughness_overrides_shininess_roughness() {
        let mut props = PropertyTable::new();
        props.set("ShininessExponent", PropertyValue::Float(25.0));
        let mut out = OutMaterial::default();
        set_shading_properties_common(&mut out, &props).unwrap();
        assert_eq!(out.float(keys::ROUGHNESS_FACTOR), Some(0.5));

        props.set("Maya|roughness", PropertyValue::Float(0.9));
        let mut out = OutMaterial::default();
        set_shading_properties_common(&mut out, &props).unwrap();
        assert_eq!(out.float(keys::ROUGHNESS_FACTOR), Some(0.9));
    }

    #[test]
    fn embedded_textures_are_converted_once() {
        let mut doc = Document::new();
        let mut material = Material {
            name: "Material::Wood".to_string(),
            shading_model: "phong".to_string(),
            ..Default::default()
        };
        material.props.set("DiffuseColor", PropertyValue::Vec3(Vec3::ONE));
        let texture = Texture {
            relative_file_name: "wood.png".to_string(),
            ..Default::default()
        };
        doc.add_object(ObjectId(1), Object::Material(material))
            .add_object(ObjectId(2), Object::Texture(texture))
            .add_object(ObjectId(3), Object::Video(Video::new("Video::Wood", "wood.png", Some(vec![1, 2, 3]))))
            .connect_property(ObjectId(2), ObjectId(1), "DiffuseColor")
            .connect(ObjectId(3), ObjectId(2));

        let settings = ImportSettings {
            use_legacy_embedded_texture_naming: true,
            ..Default::default()
        };
        let mut converter = Converter::new(&doc, &settings);
        let Some(Object::Material(material)) = doc.object(ObjectId(1)) else {
            unreachable!()
        };
        let index = converter.convert_material(ObjectId(1), material, None).unwrap();
        let out = &converter.materials[index as usize];

        assert_eq!(out.name(), Some("Wood"));
        assert_eq!(out.get(keys::SHADING_MODEL), Some(&MaterialProperty::Shading(ShadingMode::Phong)));
        assert_eq!(out.texture(TextureType::Diffuse, 0).unwrap().path, "*0");
        assert_eq!(
            out.get("$raw.DiffuseColor|file"),
            Some(&MaterialProperty::String("*0".to_string()))
        );
        assert_eq!(converter.textures.len(), 1);
        assert_eq!(converter.textures[0].data, vec![1, 2, 3]);
        assert_eq!(converter.textures[0].format_hint, "png");
    }

    #[test]
    fn out_of_range_material_index_uses_the_default() {
        let mut doc = Document::new();
        doc.add_object(ObjectId(1), Object::Model(crate::document::Model::new("Model::M")));
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        let mesh = MeshGeometry::default();
        let first = converter.convert_material_for_mesh(ObjectId(1), &mesh, 3).unwrap();
        let second = converter.convert_material_for_mesh(ObjectId(1), &mesh, -1).unwrap();
        assert_eq!(first, second);
        assert_eq!(converter.materials[0].name(), Some(DEFAULT_MATERIAL_NAME));
        assert_eq!(converter.materials[0].color(keys::COLOR_DIFFUSE), Some(Vec3::splat(0.8)));
    }

    #[test]
    fn lambert_maps_to_gouraud_shading() {
        let mut doc = Document::new();
        let material = Material {
            name: "Material::Matte".to_string(),
            shading_model: "Lambert".to_string(),
            ..Default::default()
        };
        doc.add_object(ObjectId(1), Object::Material(material));
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        let Some(Object::Material(material)) = doc.object(ObjectId(1)) else {
            unreachable!()
        };
        let index = converter.convert_material(ObjectId(1), material, None).unwrap();
        assert_eq!(
            converter.materials[index as usize].get(keys::SHADING_MODEL),
            Some(&MaterialProperty::Shading(ShadingMode::Gouraud))
        );
    }

}
