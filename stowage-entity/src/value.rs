//! Typed property values and the flat property map.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::Bound;

use crate::error::{EntityError, Result};

/// A single stored property value.
///
/// The variants are the primitive types a table row can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// UTF-8 text.
    String(String),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl PropertyValue {
    /// Storage type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "Edm.String",
            Self::Int32(_) => "Edm.Int32",
            Self::Int64(_) => "Edm.Int64",
            Self::Double(_) => "Edm.Double",
            Self::Boolean(_) => "Edm.Boolean",
            Self::DateTime(_) => "Edm.DateTime",
            Self::Binary(_) => "Edm.Binary",
        }
    }

    /// Borrow the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any integer value to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the timestamp if this is a date-time value.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// Flat mapping from property name to value.
///
/// Iteration order is the lexical order of the property names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    properties: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the map holds no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Look up a property.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Check whether a property exists.
    pub fn contains_key(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Insert or overwrite a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value.into())
    }

    /// Insert a property that must not exist yet.
    pub fn try_insert(&mut self, name: String, value: PropertyValue) -> Result<()> {
        match self.properties.entry(name) {
            btree_map::Entry::Occupied(entry) => {
                Err(EntityError::DuplicateProperty(entry.key().clone()))
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Remove a property.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// Iterate over all properties in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.properties.iter()
    }

    /// Iterate over property names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Iterate over the names that start with `prefix`.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.properties
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(key, _)| key.as_str())
            .take_while(move |key| key.starts_with(prefix))
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_insert_rejects_duplicates() {
        let mut map = PropertyMap::new();
        map.try_insert("Name".into(), "a".into()).unwrap();
        let err = map.try_insert("Name".into(), "b".into()).unwrap_err();
        assert_eq!(err, EntityError::DuplicateProperty("Name".into()));
        assert_eq!(map.get("Name").and_then(PropertyValue::as_str), Some("a"));
    }

    #[test]
    fn test_keys_with_prefix() {
        let map: PropertyMap = [
            ("Alpha", PropertyValue::from(1)),
            ("FromId", PropertyValue::from(2)),
            ("FromName", PropertyValue::from(3)),
            ("Fun", PropertyValue::from(4)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = map.keys_with_prefix("From").collect();
        assert_eq!(keys, vec!["FromId", "FromName"]);
        assert_eq!(map.keys_with_prefix("Zed").count(), 0);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(PropertyValue::from(7).as_i64(), Some(7));
        assert_eq!(PropertyValue::from(7i64).as_i64(), Some(7));
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from("x").as_i64(), None);
        assert_eq!(PropertyValue::from(vec![1u8]).type_name(), "Edm.Binary");
    }
}
