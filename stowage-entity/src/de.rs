//! Property map to entity.

use serde::de::value::{BorrowedStrDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::error::{EntityError, Result};
use crate::timestamp;
use crate::value::{PropertyMap, PropertyValue};

/// Rebuild an entity from a property map.
///
/// Each member is read from the property with its flattened name. Members
/// with no matching property are left to the target's own defaults
/// (`#[serde(default)]`), nested members are present when a property
/// carries their prefix followed by one of their own member names, and
/// properties that match no member are ignored.
pub fn unflatten<T: DeserializeOwned>(map: &PropertyMap) -> Result<T> {
    let absent = Absent::default();
    loop {
        absent.grew.set(false);
        let result = T::deserialize(StructDeserializer {
            map,
            prefix: String::new(),
            absent: &absent,
        });
        // A member claimed only by an unrelated prefixed property turned out
        // to have no data of its own shape; run again without it.
        if result.is_ok() || !absent.grew.get() {
            return result;
        }
    }
}

/// Member paths known to have no data, learned while deserializing.
///
/// Whether a member is scalar or structured is only known once serde asks
/// for its value, after the member was already announced. A member that
/// was announced because of a prefixed property but cannot use it is
/// recorded here and skipped on the next pass. Every path recorded is a
/// proper prefix of some key, so the passes are bounded.
#[derive(Default)]
struct Absent {
    paths: RefCell<BTreeSet<String>>,
    grew: Cell<bool>,
}

impl Absent {
    fn contains(&self, path: &str) -> bool {
        self.paths.borrow().contains(path)
    }

    fn mark(&self, path: &str) -> EntityError {
        if self.paths.borrow_mut().insert(path.to_string()) {
            self.grew.set(true);
        }
        EntityError::Custom(format!("property '{}' has no value", path))
    }
}

/// Deserializes one struct level whose members share `prefix`.
struct StructDeserializer<'a> {
    map: &'a PropertyMap,
    prefix: String,
    absent: &'a Absent,
}

impl<'de> Deserializer<'de> for StructDeserializer<'_> {
    type Error = EntityError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(EntityError::NotAnEntity("self-describing value"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_map(MemberAccess {
            map: self.map,
            prefix: self.prefix,
            fields,
            index: 0,
            current: None,
            absent: self.absent,
        })
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map enum identifier
    }
}

/// Whether `member` at `prefix` has data in `map`.
///
/// A member is present when its exact property exists, or when some property
/// carries its name as a prefix and is not better explained by a longer
/// sibling member name. Paths already found absent are never present.
fn is_present(
    map: &PropertyMap,
    absent: &Absent,
    prefix: &str,
    member: &str,
    siblings: &[&str],
) -> bool {
    let full = format!("{}{}", prefix, member);
    if map.contains_key(&full) {
        return true;
    }
    if absent.contains(&full) {
        return false;
    }
    let longer: Vec<String> = siblings
        .iter()
        .filter(|s| s.len() > member.len() && s.starts_with(member))
        .map(|s| format!("{}{}", prefix, s))
        .collect();
    map.keys_with_prefix(&full)
        .any(|key| !longer.iter().any(|l| key.starts_with(l.as_str())))
}

struct MemberAccess<'a> {
    map: &'a PropertyMap,
    prefix: String,
    fields: &'static [&'static str],
    index: usize,
    current: Option<&'static str>,
    absent: &'a Absent,
}

impl<'de> MapAccess<'de> for MemberAccess<'_> {
    type Error = EntityError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        while let Some(&member) = self.fields.get(self.index) {
            self.index += 1;
            if is_present(self.map, self.absent, &self.prefix, member, self.fields) {
                self.current = Some(member);
                return seed
                    .deserialize(BorrowedStrDeserializer::<EntityError>::new(member))
                    .map(Some);
            }
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let member = self
            .current
            .take()
            .ok_or_else(|| EntityError::Custom("value requested before key".into()))?;
        let key = format!("{}{}", self.prefix, member);
        let scalar = self.map.contains_key(&key);
        let result = seed.deserialize(ValueDeserializer {
            map: self.map,
            key: key.clone(),
            absent: self.absent,
        });
        if scalar {
            result.map_err(|e| e.in_property(&key))
        } else {
            result
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len() - self.index)
    }
}

/// Deserializes one member: a scalar property or a nested structure.
struct ValueDeserializer<'a> {
    map: &'a PropertyMap,
    key: String,
    absent: &'a Absent,
}

impl ValueDeserializer<'_> {
    fn value(&self) -> Option<&PropertyValue> {
        self.map.get(&self.key)
    }

    fn has_nested(&self) -> bool {
        self.map.keys_with_prefix(&self.key).next().is_some()
    }

    /// Whether some property belongs to one of `fields` under this member.
    fn claims_any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|field| {
            let path = format!("{}{}", self.key, field);
            self.map.contains_key(&path)
                || (!self.absent.contains(&path)
                    && self.map.keys_with_prefix(&path).next().is_some())
        })
    }

    fn mismatch(&self, expected: &'static str, found: &PropertyValue) -> EntityError {
        EntityError::TypeMismatch {
            property: self.key.clone(),
            expected,
            found: found.type_name(),
        }
    }
}

fn visit_value<'de, V: Visitor<'de>>(value: &PropertyValue, visitor: V) -> Result<V::Value> {
    match value {
        PropertyValue::String(s) => visitor.visit_str(s),
        PropertyValue::Int32(v) => visitor.visit_i32(*v),
        PropertyValue::Int64(v) => visitor.visit_i64(*v),
        PropertyValue::Double(v) => visitor.visit_f64(*v),
        PropertyValue::Boolean(v) => visitor.visit_bool(*v),
        PropertyValue::DateTime(v) => visitor.visit_string(timestamp::format(v)),
        PropertyValue::Binary(v) => visitor.visit_bytes(v),
    }
}

impl<'de> Deserializer<'de> for ValueDeserializer<'_> {
    type Error = EntityError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value() {
            Some(value) => visit_value(value, visitor),
            None => Err(self.absent.mark(&self.key)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.value().is_some() || self.has_nested() {
            visitor.visit_some(self)
        } else {
            visitor.visit_none()
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if let Some(value) = self.value() {
            return Err(self.mismatch("structured member", value));
        }
        if !self.claims_any(fields) {
            return Err(self.absent.mark(&self.key));
        }
        StructDeserializer {
            map: self.map,
            prefix: self.key,
            absent: self.absent,
        }
        .deserialize_struct(name, fields, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value() {
            Some(PropertyValue::String(variant)) => {
                let variant: StrDeserializer<'_, EntityError> = variant.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Some(other) => Err(self.mismatch("enum variant name", other)),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value() {
            Some(PropertyValue::Binary(bytes)) => {
                let mut seq = SeqDeserializer::<_, EntityError>::new(bytes.iter().copied());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map identifier
    }
}

