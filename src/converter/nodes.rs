use glam::Mat4;

use crate::document::{Document, Model, Object, ObjectId, PropertyValue};
use crate::error::{ConvertError, Result};
use crate::scene::{Metadata, MetadataValue, Node};

use super::transform_chain::generate_chain;
use super::{fix_node_name, Converter};

impl Converter<'_> {
    /// Converts every model connected below `id` into a node subtree.
    /// `path` holds the models on the way down from the root.
    pub(super) fn convert_nodes(
        &mut self,
        id: ObjectId,
        parent_name: &str,
        parent_transform: Mat4,
        path: &mut Vec<ObjectId>,
    ) -> Result<Vec<Node>> {
        if path.contains(&id) {
            return Err(ConvertError::CyclicHierarchy(id));
        }
        if path.len() >= self.settings.max_node_depth {
            return Err(ConvertError::HierarchyTooDeep(self.settings.max_node_depth));
        }

        let doc = self.doc;
        let mut nodes = vec![];
        path.push(id);
        for connection in doc.connections_by_destination(id, "Model") {
            if let Some(property) = &connection.property {
                log::info!("ignoring property link to node: {property}");
                continue;
            }
            let Some(Object::Model(model)) = doc.object(connection.source) else {
                log::error!("failed to load model {:?} linked to node", connection.source);
                continue;
            };
            nodes.push(self.convert_model_node(connection.source, model, parent_name, parent_transform, path)?);
        }
        path.pop();
        Ok(nodes)
    }

    fn convert_model_node(
        &mut self,
        model_id: ObjectId,
        model: &Model,
        parent_name: &str,
        parent_transform: Mat4,
        path: &mut Vec<ObjectId>,
    ) -> Result<Node> {
        let doc = self.doc;
        let original_name = fix_node_name(&model.name);
        let name = if original_name.is_empty() {
            self.unique_name(parent_name)
        } else {
            self.unique_name(&original_name)
        };

        let animated_bits = self.node_anim_chain_bits.get(&original_name).copied().unwrap_or(0);
        let chain = generate_chain(model, &name, self.settings.preserve_pivots, animated_bits)?;
        let mut nodes = chain.nodes;
        if chain.needs_additional_node {
            nodes.push(Node::new(name.as_str(), Mat4::IDENTITY));
        }

        let mut absolute = parent_transform;
        for node in &nodes {
            absolute *= node.transform;
        }
        let mut last = nodes
            .pop()
            .ok_or_else(|| ConvertError::EmptyTransformChain(name.clone()))?;
        last.metadata = Some(node_metadata(doc, model_id, model)?);
        last.meshes = self.convert_model(model_id, model, &last.name, absolute)?;

        let has_child_models = !doc.connections_by_destination(model_id, "Model").is_empty();
        let children = if has_child_models && !chain.post_nodes.is_empty() {
            for node in &chain.post_nodes {
                absolute *= node.transform;
            }
            let mut post_nodes = chain.post_nodes;
            let mut post_last = post_nodes.pop().ok_or_else(|| ConvertError::EmptyTransformChain(name.clone()))?;
            post_last.children = self.convert_nodes(model_id, &post_last.name, absolute, path)?;
            post_nodes.push(post_last);
            Node::link_chain(post_nodes).into_iter().collect()
        } else {
            self.convert_nodes(model_id, &last.name, absolute, path)?
        };
        last.children = children;

        if self.settings.read_lights || self.settings.read_cameras {
            self.convert_model_attributes(model_id, &name);
        }

        nodes.push(last);
        Node::link_chain(nodes).ok_or(ConvertError::EmptyTransformChain(name))
    }
}

/// User properties, the null-node flag and every direct property of the model.
fn node_metadata(doc: &Document, model_id: ObjectId, model: &Model) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    let user_properties = model.props.get_or::<String>("UDP3DSMAX", String::new())?;
    metadata.insert("UserProperties".to_string(), MetadataValue::String(user_properties));

    let attributes = doc.model_attributes(model_id);
    let is_null = attributes.is_empty() || attributes.iter().any(|(_, a)| matches!(a, Object::Null(_)));
    metadata.insert("IsNull".to_string(), MetadataValue::Bool(is_null));

    for (key, value) in model.props.direct_properties() {
        let value = match value {
            PropertyValue::Bool(b) => MetadataValue::Bool(*b),
            PropertyValue::Int(i) => MetadataValue::Int64(*i),
            PropertyValue::Float(f) => MetadataValue::Float(*f),
            PropertyValue::String(s) => MetadataValue::String(s.clone()),
            PropertyValue::Vec3(v) => MetadataValue::Vec3(*v),
        };
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}
