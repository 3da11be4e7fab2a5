use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VectorKey {
    pub time: f64,
    pub value: Vec3,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f64,
    pub value: Quat,
}

/// Keyframes for one node. The three key lists are sized independently.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NodeAnimation {
    pub node_name: String,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuatKey>,
    pub scaling_keys: Vec<VectorKey>,
}

impl NodeAnimation {
    pub fn is_empty(&self) -> bool {
        self.position_keys.is_empty() && self.rotation_keys.is_empty() && self.scaling_keys.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MorphKey {
    pub time: f64,
    /// Morph target indices active at this key.
    pub values: Vec<u32>,
    pub weights: Vec<f64>,
}

/// Morph weights for one mesh, named `{node}*{geometry index}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MorphAnimation {
    pub name: String,
    pub keys: Vec<MorphKey>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub name: String,
    /// In ticks.
    pub duration: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<NodeAnimation>,
    pub morph_channels: Vec<MorphAnimation>,
}

impl Animation {
    pub fn channel(&self, node_name: &str) -> Option<&NodeAnimation> {
        self.channels.iter().find(|c| c.node_name == node_name)
    }
}
