use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::document::{LineGeometry, MeshGeometry, Model, Object, ObjectId};
use crate::error::{ConvertError, Result};
use crate::scene::{Mesh, MorphTarget, PrimitiveTypes, TangentSpace, TexCoords};

use super::Converter;

fn gather<T: Copy>(source: &[T], picks: Option<&[u32]>) -> Vec<T> {
    match picks {
        Some(picks) => picks.iter().map(|&i| source[i as usize]).collect(),
        None => source.to_vec(),
    }
}

/// Tangents and bitangents. Missing binormals are derived from the
/// normals; tangents without either are dropped.
fn tangent_space(mesh: &MeshGeometry, picks: Option<&[u32]>) -> Option<TangentSpace> {
    let tangents = mesh.tangents();
    if tangents.is_empty() {
        return None;
    }
    let bitangents = if !mesh.binormals().is_empty() {
        gather(mesh.binormals(), picks)
    } else if !mesh.normals().is_empty() {
        let derived: Vec<Vec3> = mesh
            .normals()
            .iter()
            .zip(tangents)
            .map(|(n, t)| n.cross(*t))
            .collect();
        gather(&derived, picks)
    } else {
        return None;
    };
    Some(TangentSpace {
        tangents: gather(tangents, picks),
        bitangents,
    })
}

fn copy_vertex_attributes(mesh: &MeshGeometry, out: &mut Mesh, picks: Option<&[u32]>) {
    out.vertices = gather(mesh.vertices(), picks);
    if !mesh.normals().is_empty() {
        out.normals = gather(mesh.normals(), picks);
    }
    out.tangent_space = tangent_space(mesh, picks);
    out.texture_coords = mesh
        .uv_channels()
        .iter()
        .map(|channel| TexCoords {
            name: channel.name.clone(),
            coords: gather(&channel.coords, picks),
        })
        .collect();
    out.colors = mesh.color_channels().iter().map(|c| gather(c, picks)).collect();
}

/// Blend shape targets keep the channel name, qualified by the shape
/// name when the channel name has no `.` of its own.
pub(super) fn morph_target_name(channel: &str, shape: &str) -> String {
    let name = fix_anim_mesh_name(channel);
    if name.contains('.') {
        name
    } else {
        format!("{name}.{}", fix_anim_mesh_name(shape))
    }
}

/// Drops a `Class::` style prefix.
fn fix_anim_mesh_name(name: &str) -> String {
    if name.is_empty() {
        return "AnimMesh".to_string();
    }
    match name.find(':') {
        Some(i) if i + 2 < name.len() => name.get(i + 2..).unwrap_or(name).to_string(),
        _ => name.to_string(),
    }
}

impl Converter<'_> {
    /// Converts the geometry attached to a model and returns the new mesh indices.
    pub(super) fn convert_model(
        &mut self,
        model_id: ObjectId,
        model: &Model,
        node_name: &str,
        absolute: Mat4,
    ) -> Result<Vec<u32>> {
        let doc = self.doc;
        let mut meshes = vec![];
        for (geometry_id, geometry) in doc.model_geometry(model_id) {
            match geometry {
                Object::MeshGeometry(mesh) => {
                    meshes.extend(self.convert_mesh(geometry_id, mesh, model_id, node_name, absolute)?)
                }
                Object::LineGeometry(line) => meshes.extend(self.convert_line(geometry_id, line, node_name)?),
                other => log::warn!("ignoring unrecognized geometry {} on {}", other.name(), model.name),
            }
        }
        Ok(meshes)
    }

    fn mesh_name(geometry_name: &str, node_name: &str) -> String {
        let name = geometry_name.strip_prefix("Geometry::").unwrap_or(geometry_name);
        if name.is_empty() {
            node_name.to_string()
        } else {
            name.to_string()
        }
    }

    fn convert_mesh(
        &mut self,
        geometry_id: ObjectId,
        mesh: &MeshGeometry,
        model_id: ObjectId,
        node_name: &str,
        absolute: Mat4,
    ) -> Result<Vec<u32>> {
        if let Some(converted) = self.meshes_converted.get(&geometry_id) {
            return Ok(converted.clone());
        }
        if mesh.vertices().is_empty() || mesh.face_index_counts().is_empty() {
            log::warn!("ignoring empty geometry: {}", mesh.name);
            return Ok(vec![]);
        }

        let indices = mesh.material_indices();
        let converted = match indices.first() {
            Some(&first) if self.settings.read_materials && indices.iter().any(|&i| i != first) => {
                let mut seen = vec![];
                for &index in indices {
                    if !seen.contains(&index) {
                        seen.push(index);
                    }
                }
                let mut converted = Vec::with_capacity(seen.len());
                for index in seen {
                    converted.push(self.convert_mesh_multi_material(geometry_id, mesh, model_id, index, node_name, absolute)?);
                }
                converted
            }
            _ => vec![self.convert_mesh_single_material(geometry_id, mesh, model_id, node_name, absolute)?],
        };
        self.meshes_converted.insert(geometry_id, converted.clone());
        Ok(converted)
    }

    fn convert_mesh_single_material(
        &mut self,
        geometry_id: ObjectId,
        mesh: &MeshGeometry,
        model_id: ObjectId,
        node_name: &str,
        absolute: Mat4,
    ) -> Result<u32> {
        let mut out = Mesh {
            name: Self::mesh_name(&mesh.name, node_name),
            ..Default::default()
        };
        copy_vertex_attributes(mesh, &mut out, None);

        let mut cursor = 0u32;
        for &count in mesh.face_index_counts() {
            out.primitive_types.insert(PrimitiveTypes::for_face(count));
            out.faces.push((cursor..cursor + count).collect());
            cursor += count;
        }

        let indices = mesh.material_indices();
        out.material_index = match indices.first() {
            Some(&index) if self.settings.read_materials => self.convert_material_for_mesh(model_id, mesh, index)?,
            Some(_) => self.default_material_index(),
            None => {
                log::error!("no material assigned to mesh {}, setting default material", out.name);
                self.default_material_index()
            }
        };

        let mesh_index = self.meshes.len() as u32;
        let skin = self.doc.mesh_skin(geometry_id).map(|(id, _)| id);
        if self.settings.read_weights {
            if let Some(skin_id) = skin {
                self.convert_weights(&mut out, mesh, skin_id, absolute, None)?;
                self.collect_skeleton(&out, mesh_index);
            }
        }

        out.morph_targets = self.convert_blend_shapes(geometry_id, mesh, out.vertices.len(), None)?;
        self.meshes.push(out);
        Ok(mesh_index)
    }

    fn convert_mesh_multi_material(
        &mut self,
        geometry_id: ObjectId,
        mesh: &MeshGeometry,
        model_id: ObjectId,
        material_index: i32,
        node_name: &str,
        absolute: Mat4,
    ) -> Result<u32> {
        let mut out = Mesh {
            name: Self::mesh_name(&mesh.name, node_name),
            ..Default::default()
        };

        // Output vertex -> geometry vertex, and back.
        let mut reverse_mapping = vec![];
        let mut translate_index = HashMap::new();
        let mut cursor = 0u32;
        let mut in_cursor = 0u32;
        for (&count, &index) in mesh.face_index_counts().iter().zip(mesh.material_indices()) {
            if index != material_index {
                in_cursor += count;
                continue;
            }
            out.primitive_types.insert(PrimitiveTypes::for_face(count));
            let mut face = Vec::with_capacity(count as usize);
            for _ in 0..count {
                face.push(cursor);
                reverse_mapping.push(in_cursor);
                translate_index.insert(in_cursor, cursor);
                cursor += 1;
                in_cursor += 1;
            }
            out.faces.push(face);
        }
        copy_vertex_attributes(mesh, &mut out, Some(&reverse_mapping));

        out.material_index = self.convert_material_for_mesh(model_id, mesh, material_index)?;

        let mesh_index = self.meshes.len() as u32;
        let skin = self.doc.mesh_skin(geometry_id).map(|(id, _)| id);
        if self.settings.read_weights {
            if let Some(skin_id) = skin {
                self.convert_weights(&mut out, mesh, skin_id, absolute, Some((material_index, &reverse_mapping)))?;
                self.collect_skeleton(&out, mesh_index);
            }
        }

        out.morph_targets = self.convert_blend_shapes(geometry_id, mesh, out.vertices.len(), Some(&translate_index))?;
        self.meshes.push(out);
        Ok(mesh_index)
    }

    /// One morph target per shape of every blend shape channel on the geometry.
    /// `translate` maps geometry vertices to the vertices of a material split.
    fn convert_blend_shapes(
        &self,
        geometry_id: ObjectId,
        mesh: &MeshGeometry,
        vertex_count: usize,
        translate: Option<&HashMap<u32, u32>>,
    ) -> Result<Vec<MorphTarget>> {
        let doc = self.doc;
        let mut targets = vec![];
        for (blend_shape_id, _) in doc.mesh_blend_shapes(geometry_id) {
            for (channel_id, channel) in doc.blend_shape_channels(blend_shape_id) {
                let shapes = doc.channel_shapes(channel_id);
                let weight = if shapes.len() > 1 {
                    channel.deform_percent / 100.0
                } else {
                    1.0
                };
                for (_, shape) in &shapes {
                    let mut vertices = vec![Vec3::ZERO; vertex_count];
                    let mut normals = if shape.normals().is_empty() {
                        vec![]
                    } else {
                        vec![Vec3::ZERO; vertex_count]
                    };

                    for (j, &index) in shape.indices().iter().enumerate() {
                        let outputs = mesh
                            .to_output_vertex_index(index)
                            .ok_or_else(|| ConvertError::IndexOutOfRange {
                                name: shape.name.clone(),
                                what: "shape vertex",
                                index: index as i64,
                            })?;
                        for &output in outputs {
                            let target = match translate {
                                Some(translate) => match translate.get(&output) {
                                    Some(&t) => t,
                                    None => continue,
                                },
                                None => output,
                            } as usize;
                            vertices[target] += shape.vertices()[j];
                            if !normals.is_empty() {
                                normals[target] = (normals[target] + shape.normals()[j]).normalize_or_zero();
                            }
                        }
                    }

                    targets.push(MorphTarget {
                        name: morph_target_name(&channel.name, &shape.name),
                        vertices,
                        normals,
                        weight,
                    });
                }
            }
        }
        Ok(targets)
    }

    fn convert_line(&mut self, geometry_id: ObjectId, line: &LineGeometry, node_name: &str) -> Result<Vec<u32>> {
        if let Some(converted) = self.meshes_converted.get(&geometry_id) {
            return Ok(converted.clone());
        }
        if line.vertices.is_empty() || line.indices.is_empty() {
            log::warn!("ignoring empty line: {}", line.name);
            return Ok(vec![]);
        }

        let real = |i: i32| if i < 0 { -(i + 1) } else { i };
        let check = |i: i32| -> Result<u32> {
            let index = real(i);
            if index as usize >= line.vertices.len() {
                return Err(ConvertError::IndexOutOfRange {
                    name: line.name.clone(),
                    what: "line vertex",
                    index: index as i64,
                });
            }
            Ok(index as u32)
        };

        let mut out = Mesh {
            name: Self::mesh_name(&line.name, node_name),
            primitive_types: PrimitiveTypes::LINE,
            vertices: line.vertices.clone(),
            ..Default::default()
        };
        for (k, &index) in line.indices.iter().enumerate() {
            if index < 0 {
                continue;
            }
            let next = line.indices.get(k + 1).copied().unwrap_or(line.indices[0]);
            out.faces.push(vec![check(index)?, check(next)?]);
        }

        let mesh_index = self.meshes.len() as u32;
        self.meshes.push(out);
        self.meshes_converted.insert(geometry_id, vec![mesh_index]);
        Ok(vec![mesh_index])
    }
}
