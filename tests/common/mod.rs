#![allow(dead_code)]

use fbx_bake::document::{
    AnimationCurve, AnimationCurveNode, AnimationLayer, AnimationStack, Cluster, Document, FrameRate, Material,
    MeshGeometry, Model, Object, ObjectId, PropertyValue, Skin,
};
use glam::{Mat4, Vec3};

pub const SECOND: i64 = fbx_bake::converter::FBX_TICKS_PER_SECOND as i64;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a document with fresh object ids.
pub struct DocumentBuilder {
    doc: Document,
    next_id: u64,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::new();
        doc.global_settings.time_mode = FrameRate::Fps30;
        Self { doc, next_id: 1 }
    }

    pub fn add(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.doc.add_object(id, object);
        id
    }

    pub fn connect(&mut self, source: ObjectId, destination: ObjectId) -> &mut Self {
        self.doc.connect(source, destination);
        self
    }

    pub fn model(&mut self, name: &str, parent: ObjectId) -> ObjectId {
        self.model_with(Model::new(&format!("Model::{name}")), parent)
    }

    pub fn model_with(&mut self, model: Model, parent: ObjectId) -> ObjectId {
        let id = self.add(Object::Model(model));
        self.connect(id, parent);
        id
    }

    pub fn mesh(&mut self, mesh: MeshGeometry, model: ObjectId) -> ObjectId {
        let id = self.add(Object::MeshGeometry(mesh));
        self.connect(id, model);
        id
    }

    pub fn material(&mut self, material: Material, model: ObjectId) -> ObjectId {
        let id = self.add(Object::Material(material));
        self.connect(id, model);
        id
    }

    /// One skin on `geometry` with a single cluster bound to a new bone model.
    pub fn skin(&mut self, geometry: ObjectId, bone: &str, indices: Vec<u32>, weights: Vec<f32>) -> ObjectId {
        let skin = self.add(Object::Skin(Skin::default()));
        let cluster = Cluster::new("SubDeformer::Cluster", indices, weights, Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
        let cluster = self.add(Object::Cluster(cluster));
        let bone = self.add(Object::Model(Model::new(&format!("Model::{bone}"))));
        self.connect(skin, geometry).connect(cluster, skin).connect(bone, cluster);
        skin
    }

    /// A stack with one layer animating `property` of `target` with the
    /// given per-axis curves.
    pub fn animate(&mut self, target: ObjectId, property: &str, curves: &[(&str, Vec<i64>, Vec<f32>)]) -> ObjectId {
        let stack = self.add(Object::AnimationStack(AnimationStack {
            name: "AnimStack::Take 001".to_string(),
            ..Default::default()
        }));
        let layer = self.add(Object::AnimationLayer(AnimationLayer::default()));
        let node = self.add(Object::AnimationCurveNode(AnimationCurveNode::default()));
        self.connect(layer, stack).connect(node, layer);
        self.doc.connect_property(node, target, property);
        for (channel, keys, values) in curves {
            let curve = AnimationCurve::new("AnimCurve::", keys.clone(), values.clone()).unwrap();
            let curve = self.add(Object::AnimationCurve(curve));
            self.doc.connect_property(curve, node, channel);
        }
        stack
    }

    pub fn finish(self) -> Document {
        self.doc
    }
}

pub fn material(name: &str) -> Material {
    Material {
        name: format!("Material::{name}"),
        shading_model: "phong".to_string(),
        ..Default::default()
    }
}

pub fn model_with_props(name: &str, props: &[(&str, Vec3)]) -> Model {
    let mut model = Model::new(&format!("Model::{name}"));
    for (key, value) in props {
        model.props.set(key, PropertyValue::Vec3(*value));
    }
    model
}

/// Four disjoint triangles over twelve control points.
pub fn four_triangles() -> MeshGeometry {
    let points: Vec<Vec3> = (0..12).map(|i| Vec3::new(i as f32, (i % 3) as f32, 0.0)).collect();
    let mut index = vec![];
    for face in 0..4 {
        let base = face * 3;
        index.extend([base, base + 1, -(base + 2) - 1]);
    }
    MeshGeometry::new("Geometry::Strip", &points, &index).unwrap()
}

/// Two triangles sharing the edge between control points 1 and 2.
pub fn triangle_pair() -> MeshGeometry {
    let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE];
    MeshGeometry::new("Geometry::Pair", &points, &[0, 1, -3, 1, 3, -3]).unwrap()
}

/// Product of the transforms from `root`'s first child down to the node
/// called `name`, following first children.
pub fn chain_product(root: &fbx_bake::scene::Node, name: &str) -> Mat4 {
    let mut node = &root.children[0];
    let mut product = node.transform;
    while node.name != name {
        node = &node.children[0];
        product *= node.transform;
    }
    product
}
