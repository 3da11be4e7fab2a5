use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;

use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Vec3(Vec3),
}

pub trait PropertyType: Sized {
    const TYPE_NAME: &'static str;

    fn from_value(value: &PropertyValue) -> Option<Self>;
}

impl PropertyType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl PropertyType for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }
}

impl PropertyType for f32 {
    const TYPE_NAME: &'static str = "float";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }
}

impl PropertyType for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl PropertyType for Vec3 {
    const TYPE_NAME: &'static str = "vector3";

    fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// Named, typed properties of an object, with an optional shared template
/// holding the defaults for the object's type.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    properties: BTreeMap<String, PropertyValue>,
    template: Option<Arc<PropertyTable>>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(template: Arc<PropertyTable>) -> Self {
        Self {
            properties: BTreeMap::new(),
            template: Some(template),
        }
    }

    pub fn set(&mut self, name: &str, value: PropertyValue) -> &mut Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Properties set on this table, without the template.
    pub fn direct_properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a property on this table only.
    pub fn get<T: PropertyType>(&self, name: &str) -> Result<Option<T>> {
        match self.properties.get(name) {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| ConvertError::PropertyType {
                    name: name.to_string(),
                    expected: T::TYPE_NAME,
                }),
        }
    }

    /// Looks up a property, falling back to the template on a miss.
    pub fn get_or_template<T: PropertyType>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name)? {
            Some(value) => Ok(Some(value)),
            None => match &self.template {
                Some(template) => template.get_or_template(name),
                None => Ok(None),
            },
        }
    }

    pub fn get_or<T: PropertyType>(&self, name: &str, default: T) -> Result<T> {
        Ok(self.get_or_template(name)?.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_consulted_only_when_asked() {
        let mut template = PropertyTable::new();
        template.set("DiffuseColor", PropertyValue::Vec3(Vec3::splat(0.5)));
        let props = PropertyTable::with_template(Arc::new(template));

        assert_eq!(props.get::<Vec3>("DiffuseColor").unwrap(), None);
        assert_eq!(
            props.get_or_template::<Vec3>("DiffuseColor").unwrap(),
            Some(Vec3::splat(0.5))
        );
    }

    #[test]
    fn wrong_type_is_fatal() {
        let mut props = PropertyTable::new();
        props.set("Lcl Translation", PropertyValue::String("oops".into()));
        assert!(props.get::<Vec3>("Lcl Translation").is_err());
    }

    #[test]
    fn ints_widen_to_floats() {
        let mut props = PropertyTable::new();
        props.set("DecayStart", PropertyValue::Int(4));
        assert_eq!(props.get::<f32>("DecayStart").unwrap(), Some(4.0));
    }
}
