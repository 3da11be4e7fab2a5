//! In-memory FBX object graph consumed by the converter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod global_settings;
pub mod objects;
pub mod properties;

pub use geometry::{LineGeometry, MeshGeometry, ShapeGeometry, UvChannel};
pub use global_settings::{FrameRate, GlobalSettings};
pub use objects::*;
pub use properties::{PropertyTable, PropertyType, PropertyValue};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const ROOT: ObjectId = ObjectId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub source: ObjectId,
    pub destination: ObjectId,
    /// Set for object-to-property links.
    pub property: Option<String>,
}

const ANIMATED_PROPERTIES: [&str; 4] = ["Lcl Scaling", "Lcl Rotation", "Lcl Translation", "DeformPercent"];

#[derive(Debug, Default)]
pub struct Document {
    objects: BTreeMap<ObjectId, Object>,
    connections: Vec<Connection>,
    pub global_settings: GlobalSettings,
    pub creator: String,
    pub version: u32,
}

impl Document {
    pub fn new() -> Self {
        Self {
            version: 7400,
            ..Default::default()
        }
    }

    pub fn add_object(&mut self, id: ObjectId, object: Object) -> &mut Self {
        self.objects.insert(id, object);
        self
    }

    pub fn connect(&mut self, source: ObjectId, destination: ObjectId) -> &mut Self {
        self.connections.push(Connection {
            source,
            destination,
            property: None,
        });
        self
    }

    pub fn connect_property(&mut self, source: ObjectId, destination: ObjectId, property: &str) -> &mut Self {
        self.connections.push(Connection {
            source,
            destination,
            property: Some(property.to_string()),
        });
        self
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    fn class_of(&self, id: ObjectId) -> Option<&'static str> {
        self.objects.get(&id).map(Object::class_name)
    }

    /// Connections into `id` whose source object is of class `class`, in file order.
    pub fn connections_by_destination(&self, id: ObjectId, class: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.destination == id && self.class_of(c.source) == Some(class))
            .collect()
    }

    /// Every connection into `id`, including ones whose source is missing.
    pub fn connections_to(&self, id: ObjectId) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.destination == id).collect()
    }

    /// Connections out of `id` whose destination object is of class `class`, in file order.
    pub fn connections_by_source(&self, id: ObjectId, class: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source == id && self.class_of(c.destination) == Some(class))
            .collect()
    }

    pub fn has_outgoing_connections(&self, id: ObjectId) -> bool {
        self.connections.iter().any(|c| c.source == id)
    }

    fn sources<'a, T>(
        &'a self,
        id: ObjectId,
        class: &str,
        pick: impl Fn(&'a Object) -> Option<&'a T>,
    ) -> Vec<(ObjectId, &'a T)> {
        self.connections_by_destination(id, class)
            .into_iter()
            .filter(|c| c.property.is_none())
            .filter_map(|c| Some((c.source, pick(self.object(c.source)?)?)))
            .collect()
    }

    pub fn model(&self, id: ObjectId) -> Option<&Model> {
        match self.object(id)? {
            Object::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn mesh_geometry(&self, id: ObjectId) -> Option<&MeshGeometry> {
        match self.object(id)? {
            Object::MeshGeometry(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn material(&self, id: ObjectId) -> Option<&Material> {
        match self.object(id)? {
            Object::Material(material) => Some(material),
            _ => None,
        }
    }

    pub fn video(&self, id: ObjectId) -> Option<&Video> {
        match self.object(id)? {
            Object::Video(video) => Some(video),
            _ => None,
        }
    }

    /// Geometry objects attached to a model, in file order.
    pub fn model_geometry(&self, model: ObjectId) -> Vec<(ObjectId, &Object)> {
        self.sources(model, "Geometry", Some)
    }

    pub fn model_materials(&self, model: ObjectId) -> Vec<(ObjectId, &Material)> {
        self.sources(model, "Material", |o| match o {
            Object::Material(m) => Some(m),
            _ => None,
        })
    }

    pub fn model_attributes(&self, model: ObjectId) -> Vec<(ObjectId, &Object)> {
        self.sources(model, "NodeAttribute", Some)
    }

    /// Models that reference a geometry.
    pub fn geometry_models(&self, geometry: ObjectId) -> Vec<(ObjectId, &Model)> {
        self.connections_by_source(geometry, "Model")
            .into_iter()
            .filter_map(|c| Some((c.destination, self.model(c.destination)?)))
            .collect()
    }

    pub fn mesh_skin(&self, geometry: ObjectId) -> Option<(ObjectId, &Skin)> {
        self.sources(geometry, "Deformer", |o| match o {
            Object::Skin(s) => Some(s),
            _ => None,
        })
        .into_iter()
        .next()
    }

    pub fn skin_clusters(&self, skin: ObjectId) -> Vec<(ObjectId, &Cluster)> {
        self.sources(skin, "Deformer", |o| match o {
            Object::Cluster(c) => Some(c),
            _ => None,
        })
    }

    /// The bone model a cluster deforms by.
    pub fn cluster_target(&self, cluster: ObjectId) -> Option<(ObjectId, &Model)> {
        self.sources(cluster, "Model", |o| match o {
            Object::Model(m) => Some(m),
            _ => None,
        })
        .into_iter()
        .next()
    }

    pub fn mesh_blend_shapes(&self, geometry: ObjectId) -> Vec<(ObjectId, &BlendShape)> {
        self.sources(geometry, "Deformer", |o| match o {
            Object::BlendShape(b) => Some(b),
            _ => None,
        })
    }

    pub fn blend_shape_channels(&self, blend_shape: ObjectId) -> Vec<(ObjectId, &BlendShapeChannel)> {
        self.sources(blend_shape, "Deformer", |o| match o {
            Object::BlendShapeChannel(c) => Some(c),
            _ => None,
        })
    }

    pub fn channel_shapes(&self, channel: ObjectId) -> Vec<(ObjectId, &ShapeGeometry)> {
        self.sources(channel, "Geometry", |o| match o {
            Object::ShapeGeometry(s) => Some(s),
            _ => None,
        })
    }

    /// Textures bound to material properties, keyed by property name.
    pub fn material_textures(&self, material: ObjectId) -> BTreeMap<String, (ObjectId, &Texture)> {
        self.property_sources(material, "Texture", |o| match o {
            Object::Texture(t) => Some(t),
            _ => None,
        })
    }

    pub fn material_layered_textures(&self, material: ObjectId) -> BTreeMap<String, (ObjectId, &LayeredTexture)> {
        self.property_sources(material, "LayeredTexture", |o| match o {
            Object::LayeredTexture(t) => Some(t),
            _ => None,
        })
    }

    fn property_sources<'a, T>(
        &'a self,
        id: ObjectId,
        class: &str,
        pick: impl Fn(&'a Object) -> Option<&'a T>,
    ) -> BTreeMap<String, (ObjectId, &'a T)> {
        let mut out = BTreeMap::new();
        for c in self.connections_by_destination(id, class) {
            let Some(property) = &c.property else {
                continue;
            };
            if let Some(value) = self.object(c.source).and_then(&pick) {
                out.entry(property.clone()).or_insert((c.source, value));
            }
        }
        out
    }

    pub fn layered_texture_layers(&self, layered: ObjectId) -> Vec<(ObjectId, &Texture)> {
        self.sources(layered, "Texture", |o| match o {
            Object::Texture(t) => Some(t),
            _ => None,
        })
    }

    pub fn texture_media(&self, texture: ObjectId) -> Option<(ObjectId, &Video)> {
        self.sources(texture, "Video", |o| match o {
            Object::Video(v) => Some(v),
            _ => None,
        })
        .into_iter()
        .next()
    }

    pub fn animation_stacks(&self) -> Vec<(ObjectId, &AnimationStack)> {
        self.objects
            .iter()
            .filter_map(|(id, o)| match o {
                Object::AnimationStack(s) => Some((*id, s)),
                _ => None,
            })
            .collect()
    }

    pub fn stack_layers(&self, stack: ObjectId) -> Vec<(ObjectId, &AnimationLayer)> {
        self.sources(stack, "AnimationLayer", |o| match o {
            Object::AnimationLayer(l) => Some(l),
            _ => None,
        })
    }

    /// Curve nodes of a layer that animate one of the supported properties.
    pub fn layer_curve_nodes(&self, layer: ObjectId) -> Vec<(ObjectId, &AnimationCurveNode)> {
        self.sources(layer, "AnimationCurveNode", |o| match o {
            Object::AnimationCurveNode(n) => Some(n),
            _ => None,
        })
        .into_iter()
        .filter(|(id, _)| {
            self.curve_node_target(*id)
                .is_some_and(|(_, property)| ANIMATED_PROPERTIES.contains(&property))
        })
        .collect()
    }

    /// The object and property a curve node animates.
    pub fn curve_node_target(&self, node: ObjectId) -> Option<(ObjectId, &str)> {
        self.connections
            .iter()
            .find(|c| c.source == node && c.property.is_some() && self.objects.contains_key(&c.destination))
            .and_then(|c| Some((c.destination, c.property.as_deref()?)))
    }

    /// Curves of a curve node keyed by channel (`d|X`, `d|DeformPercent`, ...).
    pub fn curve_node_curves(&self, node: ObjectId) -> BTreeMap<String, &AnimationCurve> {
        self.property_sources(node, "AnimationCurve", |o| match o {
            Object::AnimationCurve(c) => Some(c),
            _ => None,
        })
        .into_iter()
        .map(|(channel, (_, curve))| (channel, curve))
        .collect()
    }
}
