use thiserror::Error;

use crate::document::ObjectId;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("property `{name}` is not of type {expected}")]
    PropertyType { name: String, expected: &'static str },
    #[error("`{name}` has {found} {attribute} entries, expected {expected}")]
    AttributeLength {
        name: String,
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("transformation chain for node `{0}` produced no nodes")]
    EmptyTransformChain(String),
    #[error("node hierarchy contains a cycle through object {0:?}")]
    CyclicHierarchy(ObjectId),
    #[error("node hierarchy exceeds the maximum depth of {0}")]
    HierarchyTooDeep(usize),
    #[error("animation curve `{name}` has {keys} keys but {values} values")]
    MalformedCurve {
        name: String,
        keys: usize,
        values: usize,
    },
    #[error("cluster `{name}` has {indices} indices but {weights} weights")]
    MalformedCluster {
        name: String,
        indices: usize,
        weights: usize,
    },
    #[error("{what} index {index} out of range in `{name}`")]
    IndexOutOfRange {
        name: String,
        what: &'static str,
        index: i64,
    },
    #[error("skin cluster `{0}` is not linked to a bone node")]
    MissingClusterTarget(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
