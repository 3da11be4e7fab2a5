//! Splits an FBX node transform into its seventeen components and either
//! bakes them into one matrix or emits one helper node per component.

use glam::{Mat4, Quat, Vec3};

use crate::document::{Model, RotationOrder};
use crate::error::Result;
use crate::scene::Node;

use super::EPSILON;

/// Marker inserted into the names of helper nodes.
pub const CHAIN_NODE_TAG: &str = "_$FbxChain$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformComponent {
    Translation,
    RotationOffset,
    RotationPivot,
    PreRotation,
    Rotation,
    PostRotation,
    RotationPivotInverse,
    ScalingOffset,
    ScalingPivot,
    Scaling,
    ScalingPivotInverse,
    GeometricScaling,
    GeometricRotation,
    GeometricTranslation,
    GeometricScalingInverse,
    GeometricRotationInverse,
    GeometricTranslationInverse,
}

use TransformComponent as C;

impl TransformComponent {
    /// Application order, outermost first.
    pub const ALL: [TransformComponent; 17] = [
        C::Translation,
        C::RotationOffset,
        C::RotationPivot,
        C::PreRotation,
        C::Rotation,
        C::PostRotation,
        C::RotationPivotInverse,
        C::ScalingOffset,
        C::ScalingPivot,
        C::Scaling,
        C::ScalingPivotInverse,
        C::GeometricScaling,
        C::GeometricRotation,
        C::GeometricTranslation,
        C::GeometricScalingInverse,
        C::GeometricRotationInverse,
        C::GeometricTranslationInverse,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> u32 {
        1 << self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            C::Translation => "Translation",
            C::RotationOffset => "RotationOffset",
            C::RotationPivot => "RotationPivot",
            C::PreRotation => "PreRotation",
            C::Rotation => "Rotation",
            C::PostRotation => "PostRotation",
            C::RotationPivotInverse => "RotationPivotInverse",
            C::ScalingOffset => "ScalingOffset",
            C::ScalingPivot => "ScalingPivot",
            C::Scaling => "Scaling",
            C::ScalingPivotInverse => "ScalingPivotInverse",
            C::GeometricScaling => "GeometricScaling",
            C::GeometricRotation => "GeometricRotation",
            C::GeometricTranslation => "GeometricTranslation",
            C::GeometricScalingInverse => "GeometricScalingInverse",
            C::GeometricRotationInverse => "GeometricRotationInverse",
            C::GeometricTranslationInverse => "GeometricTranslationInverse",
        }
    }

    /// Name of the model property holding the component.
    pub fn property_name(self) -> &'static str {
        match self {
            C::Translation => "Lcl Translation",
            C::Rotation => "Lcl Rotation",
            C::Scaling => "Lcl Scaling",
            other => other.name(),
        }
    }

    pub fn default_value(self) -> Vec3 {
        if self == C::Scaling {
            Vec3::ONE
        } else {
            Vec3::ZERO
        }
    }

    /// Translation, rotation and scaling can live in a single node transform.
    pub fn is_simple(self) -> bool {
        matches!(self, C::Translation | C::Rotation | C::Scaling)
    }

    pub fn is_rotation(self) -> bool {
        matches!(self, C::Rotation | C::PreRotation | C::PostRotation | C::GeometricRotation)
    }

    /// Applied below the node's children instead of above them.
    pub fn is_geometric_inverse(self) -> bool {
        matches!(
            self,
            C::GeometricScalingInverse | C::GeometricRotationInverse | C::GeometricTranslationInverse
        )
    }
}

pub const SIMPLE_MASK: u32 = (1 << C::Translation as u32) | (1 << C::Rotation as u32) | (1 << C::Scaling as u32);
pub const COMPLEX_MASK: u32 = ((1 << TransformComponent::ALL.len()) - 1) & !SIMPLE_MASK;

pub fn chain_node_name(name: &str, component: TransformComponent) -> String {
    format!("{name}{CHAIN_NODE_TAG}_{}", component.name())
}

/// Euler angles in degrees to a rotation matrix. The rotation applied first
/// ends up rightmost in the product.
pub fn rotation_matrix(order: RotationOrder, degrees: Vec3) -> Mat4 {
    let axis_order = match order {
        RotationOrder::EulerXyz => [2, 1, 0],
        RotationOrder::EulerXzy => [1, 2, 0],
        RotationOrder::EulerYzx => [0, 2, 1],
        RotationOrder::EulerYxz => [2, 0, 1],
        RotationOrder::EulerZxy => [1, 0, 2],
        RotationOrder::EulerZyx => [0, 1, 2],
        RotationOrder::SphericXyz => {
            log::error!("unsupported rotation order SphericXYZ, using identity");
            return Mat4::IDENTITY;
        }
    };

    let radians = Vec3::new(degrees.x.to_radians(), degrees.y.to_radians(), degrees.z.to_radians());
    let axes = [
        (radians.x.abs() > EPSILON).then(|| Mat4::from_rotation_x(radians.x)),
        (radians.y.abs() > EPSILON).then(|| Mat4::from_rotation_y(radians.y)),
        (radians.z.abs() > EPSILON).then(|| Mat4::from_rotation_z(radians.z)),
    ];

    axis_order
        .iter()
        .filter_map(|&axis| axes[axis])
        .fold(Mat4::IDENTITY, |out, m| out * m)
}

pub fn euler_to_quat(order: RotationOrder, degrees: Vec3) -> Quat {
    Quat::from_mat4(&rotation_matrix(order, degrees))
}

/// True when any pivot, offset or geometric component of the model is set.
pub fn needs_complex_chain(model: &Model) -> Result<bool> {
    for component in TransformComponent::ALL {
        if component.is_simple() {
            continue;
        }
        let Some(value) = model.props.get::<Vec3>(component.property_name())? else {
            continue;
        };
        let deviation = if component == C::GeometricScaling {
            value - Vec3::ONE
        } else {
            value
        };
        if deviation.length_squared() > EPSILON {
            return Ok(true);
        }
    }
    Ok(false)
}

pub struct TransformChain {
    /// Outermost first. Never empty.
    pub nodes: Vec<Node>,
    /// Geometric inverses, linked only when the model has children.
    pub post_nodes: Vec<Node>,
    /// The helper chain needs a plain node named after the model at its end.
    pub needs_additional_node: bool,
}

struct ComponentMatrices {
    matrices: [Mat4; 17],
    bits: u32,
}

impl ComponentMatrices {
    fn set(&mut self, component: TransformComponent, matrix: Mat4) {
        self.matrices[component.index()] = matrix;
        self.bits |= component.bit();
    }

    fn get(&self, component: TransformComponent) -> Mat4 {
        self.matrices[component.index()]
    }
}

fn component_matrices(model: &Model) -> Result<ComponentMatrices> {
    let props = &model.props;
    let order = model.rotation_order()?;
    let mut out = ComponentMatrices {
        matrices: [Mat4::IDENTITY; 17],
        bits: 0,
    };
    let non_zero = |name: &str| -> Result<Option<Vec3>> {
        Ok(props.get::<Vec3>(name)?.filter(|v| v.length_squared() > EPSILON))
    };
    let non_one = |name: &str| -> Result<Option<Vec3>> {
        Ok(props.get::<Vec3>(name)?.filter(|v| (*v - Vec3::ONE).length_squared() > EPSILON))
    };

    if let Some(pre) = non_zero("PreRotation")? {
        out.set(C::PreRotation, rotation_matrix(RotationOrder::EulerXyz, pre));
    }
    if let Some(post) = non_zero("PostRotation")? {
        out.set(C::PostRotation, rotation_matrix(RotationOrder::EulerXyz, post));
    }
    if let Some(pivot) = non_zero("RotationPivot")? {
        out.set(C::RotationPivot, Mat4::from_translation(pivot));
        out.set(C::RotationPivotInverse, Mat4::from_translation(-pivot));
    }
    if let Some(offset) = non_zero("RotationOffset")? {
        out.set(C::RotationOffset, Mat4::from_translation(offset));
    }
    if let Some(offset) = non_zero("ScalingOffset")? {
        out.set(C::ScalingOffset, Mat4::from_translation(offset));
    }
    if let Some(pivot) = non_zero("ScalingPivot")? {
        out.set(C::ScalingPivot, Mat4::from_translation(pivot));
        out.set(C::ScalingPivotInverse, Mat4::from_translation(-pivot));
    }
    if let Some(translation) = non_zero("Lcl Translation")? {
        out.set(C::Translation, Mat4::from_translation(translation));
    }
    if let Some(scaling) = non_one("Lcl Scaling")? {
        out.set(C::Scaling, Mat4::from_scale(scaling));
    }
    if let Some(rotation) = non_zero("Lcl Rotation")? {
        out.set(C::Rotation, rotation_matrix(order, rotation));
    }
    if let Some(scaling) = non_one("GeometricScaling")? {
        out.set(C::GeometricScaling, Mat4::from_scale(scaling));
        if scaling.abs().cmpgt(Vec3::splat(EPSILON)).all() {
            out.set(C::GeometricScalingInverse, Mat4::from_scale(scaling.recip()));
        } else {
            log::error!("cannot invert geometric scaling of {} with a zero axis", model.name);
        }
    }
    if let Some(rotation) = non_zero("GeometricRotation")? {
        let matrix = rotation_matrix(order, rotation);
        out.set(C::GeometricRotation, matrix);
        out.set(C::GeometricRotationInverse, matrix.inverse());
    }
    if let Some(translation) = non_zero("GeometricTranslation")? {
        out.set(C::GeometricTranslation, Mat4::from_translation(translation));
        out.set(C::GeometricTranslationInverse, Mat4::from_translation(-translation));
    }
    Ok(out)
}

/// Builds the nodes representing `model`'s local transform. `animated_bits`
/// forces components that carry their own animation channel into the chain.
pub fn generate_chain(model: &Model, name: &str, preserve_pivots: bool, animated_bits: u32) -> Result<TransformChain> {
    let components = component_matrices(model)?;

    if components.bits & COMPLEX_MASK != 0 && preserve_pivots {
        log::info!("generating full transformation chain for node: {name}");

        let mut nodes = vec![];
        let mut post_nodes = vec![];
        for component in TransformComponent::ALL {
            if (components.bits | animated_bits) & component.bit() == 0 {
                continue;
            }
            let mut matrix = components.get(component);
            if component == C::PostRotation {
                matrix = matrix.inverse();
            }
            let node = Node::new(chain_node_name(name, component), matrix);
            if component.is_geometric_inverse() {
                post_nodes.push(node);
            } else {
                nodes.push(node);
            }
        }
        return Ok(TransformChain {
            nodes,
            post_nodes,
            needs_additional_node: true,
        });
    }

    let transform = TransformComponent::ALL
        .iter()
        .fold(Mat4::IDENTITY, |out, c| out * components.get(*c));
    Ok(TransformChain {
        nodes: vec![Node::new(name, transform)],
        post_nodes: vec![],
        needs_additional_node: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PropertyValue;

    fn model_with(props: &[(&str, Vec3)]) -> Model {
        let mut model = Model::new("Model::Node");
        for (name, value) in props {
            model.props.set(name, PropertyValue::Vec3(*value));
        }
        model
    }

    fn product(nodes: &[Node]) -> Mat4 {
        nodes.iter().fold(Mat4::IDENTITY, |m, n| m * n.transform)
    }

    #[test]
    fn xyz_order_applies_x_first() {
        let m = rotation_matrix(RotationOrder::EulerXyz, Vec3::new(90.0, 90.0, 0.0));
        let expected = Mat4::from_rotation_y(90f32.to_radians()) * Mat4::from_rotation_x(90f32.to_radians());
        assert!(m.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn spheric_order_is_identity() {
        let m = rotation_matrix(RotationOrder::SphericXyz, Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(m, Mat4::IDENTITY);
    }

    #[test]
    fn simple_transform_is_a_single_node() {
        let model = model_with(&[
            ("Lcl Translation", Vec3::new(1.0, 2.0, 3.0)),
            ("Lcl Scaling", Vec3::splat(2.0)),
        ]);
        let chain = generate_chain(&model, "Node", true, 0).unwrap();
        assert_eq!(chain.nodes.len(), 1);
        assert!(!chain.needs_additional_node);
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_scale(Vec3::splat(2.0));
        assert!(chain.nodes[0].transform.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn pivot_chain_matches_baked_matrix() {
        let model = model_with(&[
            ("Lcl Rotation", Vec3::new(0.0, 45.0, 0.0)),
            ("RotationPivot", Vec3::new(1.0, 0.0, 0.0)),
        ]);
        let chained = generate_chain(&model, "Node", true, 0).unwrap();
        let baked = generate_chain(&model, "Node", false, 0).unwrap();

        let names: Vec<_> = chained.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Node_$FbxChain$_RotationPivot",
                "Node_$FbxChain$_Rotation",
                "Node_$FbxChain$_RotationPivotInverse",
            ]
        );
        assert!(chained.needs_additional_node);
        assert!(product(&chained.nodes).abs_diff_eq(baked.nodes[0].transform, 1e-5));
    }

    #[test]
    fn geometric_inverses_go_to_post_chain() {
        let model = model_with(&[("GeometricTranslation", Vec3::new(0.0, 5.0, 0.0))]);
        let chain = generate_chain(&model, "Node", true, 0).unwrap();
        assert_eq!(chain.nodes.len(), 1);
        assert_eq!(chain.post_nodes.len(), 1);
        assert_eq!(chain.post_nodes[0].name, "Node_$FbxChain$_GeometricTranslationInverse");
        assert!((chain.nodes[0].transform * chain.post_nodes[0].transform).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn zero_geometric_scale_drops_the_inverse() {
        let model = model_with(&[("GeometricScaling", Vec3::new(1.0, 0.0, 2.0))]);
        let chain = generate_chain(&model, "Node", true, 0).unwrap();
        assert_eq!(chain.nodes.len(), 1);
        assert!(chain.post_nodes.is_empty());
    }

    #[test]
    fn animated_components_survive_identity() {
        let model = model_with(&[("RotationOffset", Vec3::X)]);
        let chain = generate_chain(&model, "Node", true, C::Rotation.bit()).unwrap();
        let names: Vec<_> = chain.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Node_$FbxChain$_RotationOffset", "Node_$FbxChain$_Rotation"]);
        assert_eq!(chain.nodes[1].transform, Mat4::IDENTITY);
    }

    #[test]
    fn complex_detection_ignores_unit_geometric_scale() {
        let model = model_with(&[("GeometricScaling", Vec3::ONE), ("Lcl Translation", Vec3::X)]);
        assert!(!needs_complex_chain(&model).unwrap());
        let model = model_with(&[("ScalingPivot", Vec3::Y)]);
        assert!(needs_complex_chain(&model).unwrap());
    }
}
