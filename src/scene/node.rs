use std::collections::BTreeMap;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Vec3(Vec3),
}

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Mat4,
    pub children: Vec<Node>,
    /// Indices into `Scene::meshes`.
    pub meshes: Vec<u32>,
    pub metadata: Option<Metadata>,
}

impl Node {
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            transform,
            children: vec![],
            meshes: vec![],
            metadata: None,
        }
    }

    /// Depth-first search by name.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Turns a parent-to-child chain of nodes into nested nodes and returns the head.
    pub fn link_chain(chain: Vec<Node>) -> Option<Node> {
        chain.into_iter().rev().fold(None, |child, mut node| {
            if let Some(child) = child {
                node.children.push(child);
            }
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_nest_in_order() {
        let chain = vec![
            Node::new("a", Mat4::IDENTITY),
            Node::new("b", Mat4::IDENTITY),
            Node::new("c", Mat4::IDENTITY),
        ];
        let head = Node::link_chain(chain).unwrap();
        assert_eq!(head.name, "a");
        assert_eq!(head.children[0].name, "b");
        assert_eq!(head.children[0].children[0].name, "c");
        assert!(head.find("c").is_some());

        let mut names = vec![];
        head.walk(&mut |n| names.push(n.name.clone()));
        assert_eq!(names, ["a", "b", "c"]);
    }
}
