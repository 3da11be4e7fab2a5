//! Animation stacks to keyframed node and morph channels.
//!
//! Every stack becomes one [`Animation`]. Curve nodes are grouped by the
//! model they animate; a model whose transform only uses translation,
//! rotation and scaling gets a single baked channel, otherwise each animated
//! component drives its own helper node of the transform chain.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};

use crate::document::{AnimationStack, Document, Model, Object, ObjectId, RotationOrder};
use crate::error::Result;
use crate::scene::{Animation, MorphAnimation, MorphKey, NodeAnimation, QuatKey, VectorKey};

use super::keyframes::{
    interpolate_keys, interpolate_rotation_keys, key_time_list, keyframe_list, rotation_keyframe_list, CurveMap,
    KeyframeList, TimeRange,
};
use super::transform_chain::{chain_node_name, euler_to_quat, needs_complex_chain, TransformComponent as C};
use super::{fix_node_name, ticks_to_seconds, Converter, EPSILON};

/// Stacks without a local range sample everything short of the tick limits.
const OPEN_RANGE_MARGIN: i64 = 20_000;

struct CurveNodeRef<'a> {
    property: &'a str,
    target: &'a Model,
    curves: CurveMap<'a>,
}

#[derive(Default)]
struct MorphKeyData {
    values: Vec<u32>,
    weights: Vec<f64>,
}

/// Morph keys by output name, then by FBX time.
type MorphData = BTreeMap<String, BTreeMap<i64, MorphKeyData>>;

/// Curve nodes per transform component, indexed by [`C::index`].
type Chain<'a> = [Option<&'a [&'a CurveMap<'a>]>; 17];

impl Converter<'_> {
    pub(super) fn convert_animations(&mut self) -> Result<()> {
        let doc = self.doc;
        for (stack_id, stack) in doc.animation_stacks() {
            self.convert_animation_stack(stack_id, stack)?;
        }
        Ok(())
    }

    fn convert_animation_stack(&mut self, stack_id: ObjectId, stack: &AnimationStack) -> Result<()> {
        let doc = self.doc;
        let layers = doc.stack_layers(stack_id);
        if layers.is_empty() {
            return Ok(());
        }
        let name = stack
            .name
            .strip_prefix("AnimationStack::")
            .or_else(|| stack.name.strip_prefix("AnimStack::"))
            .unwrap_or(&stack.name)
            .to_string();

        let mut node_map: BTreeMap<String, Vec<CurveNodeRef>> = BTreeMap::new();
        let mut morph_data = MorphData::new();
        for (layer_id, _) in layers {
            for (node_id, _) in doc.layer_curve_nodes(layer_id) {
                let Some((target_id, property)) = doc.curve_node_target(node_id) else {
                    continue;
                };
                let curves = doc.curve_node_curves(node_id);
                match doc.object(target_id) {
                    Some(Object::Model(model)) => {
                        node_map.entry(fix_node_name(&model.name)).or_default().push(CurveNodeRef {
                            property,
                            target: model,
                            curves,
                        });
                    }
                    Some(Object::BlendShapeChannel(_)) => collect_morph_keys(doc, target_id, &curves, &mut morph_data),
                    _ => {}
                }
            }
        }

        let has_local_range = stack.local_start != 0 || stack.local_stop != 0;
        let (start, stop) = if has_local_range {
            (stack.local_start, stack.local_stop)
        } else {
            (i64::MIN + OPEN_RANGE_MARGIN, i64::MAX - OPEN_RANGE_MARGIN)
        };

        let mut range = TimeRange::default();
        let mut channels = vec![];
        for (fixed_name, nodes) in &node_map {
            channels.extend(self.generate_node_animations(fixed_name, nodes, start, stop, &mut range)?);
        }

        if channels.is_empty() && morph_data.is_empty() {
            log::info!("ignoring empty animation stack (using IK?): {name}");
            return Ok(());
        }

        let fps = self.fps;
        let mut morph_channels: Vec<MorphAnimation> = morph_data
            .into_iter()
            .map(|(name, keys)| MorphAnimation {
                name,
                keys: keys
                    .into_iter()
                    .map(|(time, data)| {
                        let time = ticks_to_seconds(time) * fps;
                        range.update(time);
                        MorphKey {
                            time,
                            values: data.values,
                            weights: data.weights,
                        }
                    })
                    .collect(),
            })
            .collect();

        let (start_frame, stop_frame) = if has_local_range {
            (ticks_to_seconds(start) * fps, ticks_to_seconds(stop) * fps)
        } else if range.min <= range.max {
            (range.min, range.max)
        } else {
            (0.0, 0.0)
        };

        for channel in &mut channels {
            for key in &mut channel.position_keys {
                key.time -= start_frame;
            }
            for key in &mut channel.rotation_keys {
                key.time -= start_frame;
            }
            for key in &mut channel.scaling_keys {
                key.time -= start_frame;
            }
        }
        for key in morph_channels.iter_mut().flat_map(|m| m.keys.iter_mut()) {
            key.time -= start_frame;
        }

        log::debug!(
            "animation {name}: {} node channels, {} morph channels",
            channels.len(),
            morph_channels.len()
        );
        self.animations.push(Animation {
            name,
            duration: stop_frame - start_frame,
            ticks_per_second: fps,
            channels,
            morph_channels,
        });
        Ok(())
    }

    /// Channels for one model. A model that needs a full transform chain gets
    /// one channel per animated component, and the animated components are
    /// remembered so the chain keeps their helper nodes.
    fn generate_node_animations(
        &mut self,
        fixed_name: &str,
        nodes: &[CurveNodeRef],
        start: i64,
        stop: i64,
        range: &mut TimeRange,
    ) -> Result<Vec<NodeAnimation>> {
        let mut by_property: BTreeMap<&str, Vec<&CurveMap>> = BTreeMap::new();
        let mut target = None;
        for node in nodes {
            if node.property.is_empty() {
                log::warn!("target property for animation node not set: {fixed_name}");
                continue;
            }
            target = Some(node.target);
            if node.curves.is_empty() {
                log::warn!("no animation curves assigned to animation curve node of {fixed_name}");
                continue;
            }
            by_property.entry(node.property).or_default().push(&node.curves);
        }
        let Some(target) = target else {
            log::warn!("ignoring node animation of {fixed_name}, no animated target");
            return Ok(vec![]);
        };

        let mut chain: Chain = [None; 17];
        let mut has_any = false;
        let mut has_complex = false;
        for component in C::ALL {
            if matches!(component, C::RotationPivotInverse | C::ScalingPivotInverse) || component.is_geometric_inverse()
            {
                continue;
            }
            let Some(curves) = by_property.get(component.property_name()) else {
                continue;
            };
            if self.settings.optimize_empty_animation_curves && is_redundant(target, component, curves)? {
                log::debug!("dropping redundant {} channel of {fixed_name}", component.name());
                continue;
            }
            has_any = true;
            has_complex |= !component.is_simple();
            chain[component.index()] = Some(curves.as_slice());
        }

        if !has_any {
            log::warn!("ignoring node animation of {fixed_name}, did not find any transformation key frames");
            return Ok(vec![]);
        }

        if !self.settings.preserve_pivots || (!has_complex && !needs_complex_chain(target)?) {
            let channel = self.simple_node_animation(fixed_name, target, &chain, start, stop, range)?;
            return Ok(if channel.is_empty() { vec![] } else { vec![channel] });
        }

        let fps = self.fps;
        let order = target.rotation_order()?;
        let mut flags = 0;
        let mut out = vec![];
        for component in C::ALL {
            let Some(curves) = chain[component.index()] else {
                continue;
            };
            flags |= component.bit();
            let name = chain_node_name(fixed_name, component);
            match component {
                C::Rotation | C::PreRotation | C::PostRotation | C::GeometricRotation => {
                    let lists = rotation_keyframe_list(curves, start, stop);
                    let times = key_time_list(&lists);
                    out.push(NodeAnimation {
                        node_name: name,
                        rotation_keys: interpolate_rotation_keys(&times, &lists, Vec3::ZERO, order, fps, range),
                        position_keys: vec![VectorKey { time: 0.0, value: Vec3::ZERO }],
                        scaling_keys: vec![VectorKey { time: 0.0, value: Vec3::ONE }],
                    });
                }
                C::Translation
                | C::RotationOffset
                | C::RotationPivot
                | C::ScalingOffset
                | C::ScalingPivot
                | C::GeometricTranslation => {
                    let lists = keyframe_list(curves, start, stop);
                    let times = key_time_list(&lists);
                    let keys = interpolate_keys(&times, &lists, Vec3::ZERO, fps, range);
                    let inverse = match component {
                        C::RotationPivot => Some(C::RotationPivotInverse),
                        C::ScalingPivot => Some(C::ScalingPivotInverse),
                        _ => None,
                    };
                    if let Some(inverse) = inverse {
                        let negated = keys.iter().map(|k| VectorKey { time: k.time, value: -k.value }).collect();
                        out.push(translation_channel(chain_node_name(fixed_name, inverse), negated));
                        flags |= inverse.bit();
                    }
                    out.push(translation_channel(name, keys));
                }
                C::Scaling | C::GeometricScaling => {
                    let lists = keyframe_list(curves, start, stop);
                    let times = key_time_list(&lists);
                    out.push(NodeAnimation {
                        node_name: name,
                        scaling_keys: interpolate_keys(&times, &lists, Vec3::ONE, fps, range),
                        position_keys: vec![VectorKey { time: 0.0, value: Vec3::ZERO }],
                        rotation_keys: vec![QuatKey { time: 0.0, value: Quat::IDENTITY }],
                    });
                }
                _ => {}
            }
        }
        out.retain(|channel| !channel.is_empty());

        self.node_anim_chain_bits.insert(fixed_name.to_string(), flags);
        Ok(out)
    }

    /// One channel carrying the whole local transform, with pre- and
    /// post-rotation folded into the rotation keys.
    fn simple_node_animation(
        &self,
        fixed_name: &str,
        target: &Model,
        chain: &Chain,
        start: i64,
        stop: i64,
        range: &mut TimeRange,
    ) -> Result<NodeAnimation> {
        let lists = |component: C| -> Vec<KeyframeList> {
            match chain[component.index()] {
                None => vec![],
                Some(nodes) if component.is_rotation() => rotation_keyframe_list(nodes, start, stop),
                Some(nodes) => keyframe_list(nodes, start, stop),
            }
        };
        let translation = lists(C::Translation);
        let rotation = lists(C::Rotation);
        let scaling = lists(C::Scaling);
        let times = key_time_list(translation.iter().chain(&rotation).chain(&scaling));

        let props = &target.props;
        let order = target.rotation_order()?;
        let fps = self.fps;
        let mut translations = interpolate_keys(
            &times,
            &translation,
            props.get_or(C::Translation.property_name(), Vec3::ZERO)?,
            fps,
            range,
        );
        let mut rotations = interpolate_rotation_keys(
            &times,
            &rotation,
            props.get_or(C::Rotation.property_name(), Vec3::ZERO)?,
            order,
            fps,
            range,
        );
        let mut scalings = interpolate_keys(
            &times,
            &scaling,
            props.get_or(C::Scaling.property_name(), Vec3::ONE)?,
            fps,
            range,
        );

        if let Some(pre) = props.get::<Vec3>("PreRotation")?.filter(|v| v.length_squared() > EPSILON) {
            let pre = euler_to_quat(RotationOrder::EulerXyz, pre);
            for key in &mut rotations {
                key.value = pre * key.value;
            }
        }
        if let Some(post) = props.get::<Vec3>("PostRotation")?.filter(|v| v.length_squared() > EPSILON) {
            let post = euler_to_quat(RotationOrder::EulerXyz, post);
            for key in &mut rotations {
                key.value = key.value * post;
            }
        }

        let mut last = Quat::IDENTITY;
        for ((t, r), s) in translations.iter_mut().zip(&mut rotations).zip(&mut scalings) {
            let matrix = Mat4::from_scale_rotation_translation(s.value, r.value, t.value);
            let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
            let rotation = if rotation.dot(last) < 0.0 { -rotation } else { rotation };
            last = rotation;
            s.value = scale;
            r.value = rotation;
            t.value = translation;
        }

        Ok(NodeAnimation {
            node_name: fixed_name.to_string(),
            position_keys: translations,
            rotation_keys: rotations,
            scaling_keys: scalings,
        })
    }
}

fn translation_channel(node_name: String, position_keys: Vec<VectorKey>) -> NodeAnimation {
    NodeAnimation {
        node_name,
        position_keys,
        rotation_keys: vec![QuatKey { time: 0.0, value: Quat::IDENTITY }],
        scaling_keys: vec![VectorKey { time: 0.0, value: Vec3::ONE }],
    }
}

/// A component is redundant when its only curve node holds a single key
/// per axis that equals the model's static value.
fn is_redundant(target: &Model, component: C, nodes: &[&CurveMap]) -> Result<bool> {
    let [curves] = nodes else {
        return Ok(false);
    };
    let mut animated = Vec3::ZERO;
    for (axis, channel) in ["d|X", "d|Y", "d|Z"].into_iter().enumerate() {
        match curves.get(channel).map(|c| c.values()) {
            Some([value]) => animated[axis] = *value,
            _ => return Ok(false),
        }
    }
    let value = target
        .props
        .get_or(component.property_name(), component.default_value())?;
    Ok((animated - value).length_squared() < EPSILON)
}

/// Records the `DeformPercent` keys of a blend shape channel for every mesh
/// instance the channel deforms.
fn collect_morph_keys(doc: &Document, channel_id: ObjectId, curves: &CurveMap, out: &mut MorphData) {
    let Some(curve) = curves.get("d|DeformPercent") else {
        return;
    };
    for deformer in doc.connections_by_source(channel_id, "Deformer") {
        let blend_shape = deformer.destination;
        if !matches!(doc.object(blend_shape), Some(Object::BlendShape(_))) {
            continue;
        }
        let Some(channel_index) = doc
            .blend_shape_channels(blend_shape)
            .iter()
            .position(|(id, _)| *id == channel_id)
        else {
            continue;
        };
        for geometry in doc.connections_by_source(blend_shape, "Geometry") {
            let geometry_id = geometry.destination;
            for (model_id, model) in doc.geometry_models(geometry_id) {
                let attached = doc.model_geometry(model_id);
                let geometry_index = attached
                    .iter()
                    .position(|(id, _)| *id == geometry_id)
                    .unwrap_or(attached.len());
                let name = format!("{}{geometry_index}", fix_node_name(&format!("{}*", model.name)));
                let keys = out.entry(name).or_default();
                for (&time, &value) in curve.keys().iter().zip(curve.values()) {
                    let key = keys.entry(time).or_default();
                    key.values.push(channel_index as u32);
                    key.weights.push(value as f64 / 100.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::FBX_TICKS_PER_SECOND;
    use crate::document::{
        AnimationCurve, AnimationCurveNode, AnimationLayer, BlendShape, BlendShapeChannel, FrameRate, MeshGeometry,
        PropertyValue,
    };
    use crate::settings::ImportSettings;

    const SECOND: i64 = FBX_TICKS_PER_SECOND as i64;

    /// A stack with one layer and one curve node animating `property` of the
    /// object with id 1. Curves get ids starting at 100.
    fn animated_document(model: Object, property: &str, curves: &[(&str, Vec<i64>, Vec<f32>)]) -> Document {
        let mut doc = Document::new();
        doc.global_settings.time_mode = FrameRate::Fps30;
        doc.add_object(ObjectId(1), model)
            .add_object(
                ObjectId(10),
                Object::AnimationStack(AnimationStack {
                    name: "AnimStack::Take 001".to_string(),
                    ..Default::default()
                }),
            )
            .add_object(ObjectId(11), Object::AnimationLayer(AnimationLayer::default()))
            .add_object(ObjectId(12), Object::AnimationCurveNode(AnimationCurveNode::default()))
            .connect(ObjectId(11), ObjectId(10))
            .connect(ObjectId(12), ObjectId(11))
            .connect_property(ObjectId(12), ObjectId(1), property);
        for (i, (channel, keys, values)) in curves.iter().enumerate() {
            let id = ObjectId(100 + i as u64);
            let curve = AnimationCurve::new("AnimCurve::", keys.clone(), values.clone()).unwrap();
            doc.add_object(id, Object::AnimationCurve(curve))
                .connect_property(id, ObjectId(12), channel);
        }
        doc
    }

    fn run(doc: &Document, settings: &ImportSettings) -> (Vec<Animation>, std::collections::HashMap<String, u32>) {
        let mut converter = Converter::new(doc, settings);
        converter.convert_animations().unwrap();
        (converter.animations, converter.node_anim_chain_bits)
    }

    #[test]
    fn translation_curve_becomes_a_baked_channel() {
        let doc = animated_document(
            Object::Model(Model::new("Model::Cube")),
            "Lcl Translation",
            &[("d|X", vec![SECOND, 2 * SECOND], vec![0.0, 10.0])],
        );
        let (animations, bits) = run(&doc, &ImportSettings::default());
        assert_eq!(animations.len(), 1);
        let animation = &animations[0];
        assert_eq!(animation.name, "Take 001");
        assert_eq!(animation.ticks_per_second, 30.0);
        assert!((animation.duration - 30.0).abs() < 1e-6);

        let channel = animation.channel("Cube").unwrap();
        assert_eq!(channel.position_keys.len(), 2);
        assert_eq!(channel.rotation_keys.len(), 2);
        assert!(channel.position_keys[0].time.abs() < 1e-6);
        assert!((channel.position_keys[1].time - 30.0).abs() < 1e-6);
        assert!(channel.position_keys[1].value.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(channel.scaling_keys[0].value.abs_diff_eq(Vec3::ONE, 1e-5));
        assert!(bits.is_empty());
    }

    #[test]
    fn local_range_sets_start_and_duration() {
        let mut doc = animated_document(
            Object::Model(Model::new("Model::Cube")),
            "Lcl Translation",
            &[("d|X", vec![SECOND, 2 * SECOND], vec![0.0, 10.0])],
        );
        doc.add_object(
            ObjectId(10),
            Object::AnimationStack(AnimationStack {
                name: "AnimationStack::Walk".to_string(),
                local_start: 0,
                local_stop: 4 * SECOND,
            }),
        );
        let (animations, _) = run(&doc, &ImportSettings::default());
        assert_eq!(animations[0].name, "Walk");
        assert!((animations[0].duration - 120.0).abs() < 1e-6);
        assert!((animations[0].channels[0].position_keys[0].time - 30.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_keys_before_the_local_range_are_clipped() {
        let mut doc = animated_document(
            Object::Model(Model::new("Model::Wheel")),
            "Lcl Rotation",
            &[("d|X", vec![0, 5 * SECOND / 2], vec![0.0, 90.0])],
        );
        doc.add_object(
            ObjectId(10),
            Object::AnimationStack(AnimationStack {
                name: "AnimStack::Roll".to_string(),
                local_start: 2 * SECOND,
                local_stop: 3 * SECOND,
            }),
        );
        let (animations, _) = run(&doc, &ImportSettings::default());
        let times: Vec<_> = animations[0].channels[0]
            .rotation_keys
            .iter()
            .map(|k| k.time.round())
            .collect();
        assert_eq!(times, [15.0]);
    }

    #[test]
    fn pre_rotation_is_folded_into_rotation_keys() {
        let mut model = Model::new("Model::Arm");
        model.props.set("PreRotation", PropertyValue::Vec3(Vec3::new(0.0, 0.0, 90.0)));
        let doc = animated_document(Object::Model(model), "Lcl Rotation", &[("d|X", vec![0], vec![0.0])]);
        let settings = ImportSettings {
            preserve_pivots: false,
            ..Default::default()
        };
        let (animations, _) = run(&doc, &settings);
        let rotation = animations[0].channels[0].rotation_keys[0].value;
        let expected = Quat::from_rotation_z(90f32.to_radians());
        assert!(rotation.abs_diff_eq(expected, 1e-5) || rotation.abs_diff_eq(-expected, 1e-5));
    }

    #[test]
    fn redundant_curves_are_dropped() {
        let mut model = Model::new("Model::Still");
        model.props.set("Lcl Translation", PropertyValue::Vec3(Vec3::new(1.0, 2.0, 3.0)));
        let doc = animated_document(
            Object::Model(model),
            "Lcl Translation",
            &[
                ("d|X", vec![0], vec![1.0]),
                ("d|Y", vec![0], vec![2.0]),
                ("d|Z", vec![0], vec![3.0]),
            ],
        );
        let (animations, _) = run(&doc, &ImportSettings::default());
        assert!(animations.is_empty());

        let settings = ImportSettings {
            optimize_empty_animation_curves: false,
            ..Default::default()
        };
        let (animations, _) = run(&doc, &settings);
        assert_eq!(animations.len(), 1);
    }

    #[test]
    fn pivoted_models_get_per_component_channels() {
        let mut model = Model::new("Model::Door");
        model.props.set("RotationPivot", PropertyValue::Vec3(Vec3::new(1.0, 0.0, 0.0)));
        let doc = animated_document(
            Object::Model(model),
            "Lcl Rotation",
            &[("d|Y", vec![0, SECOND], vec![0.0, 90.0])],
        );
        let (animations, bits) = run(&doc, &ImportSettings::default());
        let channel = animations[0].channel("Door_$FbxChain$_Rotation").unwrap();
        assert_eq!(channel.rotation_keys.len(), 2);
        assert_eq!(channel.position_keys, vec![VectorKey { time: 0.0, value: Vec3::ZERO }]);
        assert_eq!(bits.get("Door"), Some(&C::Rotation.bit()));
        assert!(animations[0].channel("Door").is_none());
    }

    /// A smile channel at index 1 of a blend shape on the `Head` model's mesh.
    fn blend_shape_document(channel: &str) -> Document {
        let mut doc = animated_document(
            Object::BlendShapeChannel(BlendShapeChannel {
                name: "SubDeformer::Smile".to_string(),
                ..Default::default()
            }),
            "DeformPercent",
            &[(channel, vec![0, SECOND], vec![0.0, 50.0])],
        );
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = MeshGeometry::new("Geometry::Face", &points, &[0, 1, -3]).unwrap();
        doc.add_object(ObjectId(2), Object::BlendShapeChannel(BlendShapeChannel::default()))
            .add_object(ObjectId(3), Object::BlendShape(BlendShape::default()))
            .add_object(ObjectId(4), Object::MeshGeometry(mesh))
            .add_object(ObjectId(5), Object::Model(Model::new("Model::Head")))
            .connect(ObjectId(2), ObjectId(3))
            .connect(ObjectId(1), ObjectId(3))
            .connect(ObjectId(3), ObjectId(4))
            .connect(ObjectId(4), ObjectId(5));
        doc
    }

    #[test]
    fn deform_percent_becomes_morph_weights() {
        let doc = blend_shape_document("d|DeformPercent");
        let (animations, _) = run(&doc, &ImportSettings::default());
        let animation = &animations[0];
        assert!(animation.channels.is_empty());
        let morph = &animation.morph_channels[0];
        assert_eq!(morph.name, "Head*0");
        assert_eq!(morph.keys.len(), 2);
        assert_eq!(morph.keys[1].values, vec![1]);
        assert_eq!(morph.keys[1].weights, vec![0.5]);
        assert!((morph.keys[1].time - 30.0).abs() < 1e-6);
        assert!((animation.duration - 30.0).abs() < 1e-6);
    }

    #[test]
    fn blend_shape_nodes_without_deform_percent_leave_no_morph_channel() {
        let doc = blend_shape_document("d|X");
        let (animations, _) = run(&doc, &ImportSettings::default());
        assert!(animations.is_empty());
    }

    #[test]
    fn stacks_without_layers_are_skipped() {
        let mut doc = Document::new();
        doc.add_object(ObjectId(10), Object::AnimationStack(AnimationStack::default()));
        let (animations, _) = run(&doc, &ImportSettings::default());
        assert!(animations.is_empty());
    }
}
