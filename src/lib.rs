//! Converts an in-memory FBX document into a flat scene graph of nodes,
//! meshes, materials, animations, lights and cameras.

pub mod converter;
pub mod document;
pub mod error;
pub mod scene;
pub mod settings;

pub use converter::convert_to_scene;
pub use error::{ConvertError, Result};
pub use scene::Scene;
pub use settings::ImportSettings;
