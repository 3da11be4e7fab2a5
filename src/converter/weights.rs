use std::collections::HashMap;

use glam::Mat4;

use crate::document::{MeshGeometry, ObjectId};
use crate::error::{ConvertError, Result};
use crate::scene::{Bone, Mesh, Skeleton, SkeletonBone, VertexWeight};

use super::{fix_node_name, Converter};

impl Converter<'_> {
    /// Turns the clusters of a skin into bones on `out`. For a material
    /// split, `split` holds the material index and the output-to-geometry
    /// vertex mapping of the sub-mesh.
    pub(super) fn convert_weights(
        &mut self,
        out: &mut Mesh,
        mesh: &MeshGeometry,
        skin_id: ObjectId,
        absolute: Mat4,
        split: Option<(i32, &[u32])>,
    ) -> Result<()> {
        let doc = self.doc;
        let mut bones: Vec<Bone> = vec![];
        // Bones already created for this mesh, by target node name.
        let mut bone_map: HashMap<String, usize> = HashMap::new();

        for (cluster_id, cluster) in doc.skin_clusters(skin_id) {
            let mut out_indices = vec![];
            let mut weights = vec![];
            for (&index, &weight) in cluster.indices().iter().zip(cluster.weights()) {
                let outputs = mesh
                    .to_output_vertex_index(index)
                    .ok_or_else(|| ConvertError::IndexOutOfRange {
                        name: cluster.name.clone(),
                        what: "cluster vertex",
                        index: index as i64,
                    })?;
                for &output in outputs {
                    let vertex_id = match split {
                        None => output,
                        Some((material_index, reverse_mapping)) => {
                            let face = mesh.face_for_vertex_index(output);
                            if face.and_then(|f| mesh.material_indices().get(f)) != Some(&material_index) {
                                continue;
                            }
                            reverse_mapping.partition_point(|&v| v < output) as u32
                        }
                    };
                    out_indices.push(vertex_id);
                    weights.push(VertexWeight { vertex_id, weight });
                }
            }

            if weights.is_empty() && self.settings.remove_empty_bones {
                continue;
            }

            let (_, target) = doc
                .cluster_target(cluster_id)
                .ok_or_else(|| ConvertError::MissingClusterTarget(cluster.name.clone()))?;
            if let Some(&bone) = bone_map.get(&target.name) {
                bones[bone].weights.extend(weights);
                continue;
            }
            bone_map.insert(target.name.clone(), bones.len());
            bones.push(Bone {
                name: fix_node_name(&target.name),
                offset: cluster.transform_link.inverse() * absolute,
                weights,
            });
        }

        out.bones = bones;
        Ok(())
    }

    /// Mirrors the bones of a converted mesh into a flat skeleton.
    pub(super) fn collect_skeleton(&mut self, mesh: &Mesh, mesh_index: u32) {
        if !self.settings.use_skeleton || mesh.bones.is_empty() {
            return;
        }
        let bones = mesh
            .bones
            .iter()
            .map(|bone| SkeletonBone {
                name: bone.name.clone(),
                parent: -1,
                mesh_index,
                offset: bone.offset,
                weights: bone.weights.clone(),
            })
            .collect();
        self.skeletons.push(Skeleton { bones });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::document::{Cluster, Document, Model, Object, Skin};
    use crate::settings::ImportSettings;

    fn skinned_document(indices: Vec<u32>, weights: Vec<f32>) -> Document {
        let mut doc = Document::new();
        let cluster = Cluster::new(
            "SubDeformer::Cluster",
            indices,
            weights,
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::Y),
        )
        .unwrap();
        doc.add_object(ObjectId(20), Object::Skin(Skin::default()))
            .add_object(ObjectId(21), Object::Cluster(cluster))
            .add_object(ObjectId(22), Object::Model(Model::new("Model::Bone")))
            .connect(ObjectId(21), ObjectId(20))
            .connect(ObjectId(22), ObjectId(21));
        doc
    }

    fn triangle_pair() -> MeshGeometry {
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        MeshGeometry::new("Geometry::Pair", &points, &[0, 1, -3, 1, 3, -3])
            .unwrap()
            .with_material_indices(vec![0, 1])
            .unwrap()
    }

    #[test]
    fn bones_get_inverse_bind_offsets() {
        let doc = skinned_document(vec![1], vec![0.5]);
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        let mut out = Mesh::default();
        converter
            .convert_weights(&mut out, &triangle_pair(), ObjectId(20), Mat4::IDENTITY, None)
            .unwrap();

        assert_eq!(out.bones.len(), 1);
        let bone = &out.bones[0];
        assert_eq!(bone.name, "Bone");
        assert!(bone.offset.abs_diff_eq(Mat4::from_translation(-Vec3::Y), 1e-6));
        // Control point 1 appears in both triangles.
        let ids: Vec<_> = bone.weights.iter().map(|w| w.vertex_id).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[test]
    fn split_weights_are_remapped() {
        let doc = skinned_document(vec![1], vec![0.5]);
        let settings = ImportSettings::default();
        let mut converter = Converter::new(&doc, &settings);
        let mut out = Mesh::default();
        let reverse_mapping = [3, 4, 5];
        converter
            .convert_weights(&mut out, &triangle_pair(), ObjectId(20), Mat4::IDENTITY, Some((1, &reverse_mapping)))
            .unwrap();
        assert_eq!(out.bones[0].weights, vec![VertexWeight { vertex_id: 0, weight: 0.5 }]);
    }

    #[test]
    fn empty_bones_follow_the_setting() {
        let doc = skinned_document(vec![], vec![]);
        let mut settings = ImportSettings::default();
        let mut out = Mesh::default();
        Converter::new(&doc, &settings)
            .convert_weights(&mut out, &triangle_pair(), ObjectId(20), Mat4::IDENTITY, None)
            .unwrap();
        assert!(out.bones.is_empty());

        settings.remove_empty_bones = false;
        Converter::new(&doc, &settings)
            .convert_weights(&mut out, &triangle_pair(), ObjectId(20), Mat4::IDENTITY, None)
            .unwrap();
        assert_eq!(out.bones.len(), 1);
        assert!(out.bones[0].weights.is_empty());
    }

    #[test]
    fn out_of_range_cluster_index_is_fatal() {
        let doc = skinned_document(vec![9], vec![1.0]);
        let settings = ImportSettings::default();
        let mut out = Mesh::default();
        let result =
            Converter::new(&doc, &settings).convert_weights(&mut out, &triangle_pair(), ObjectId(20), Mat4::IDENTITY, None);
        assert!(matches!(result, Err(ConvertError::IndexOutOfRange { index: 9, .. })));
    }
}
