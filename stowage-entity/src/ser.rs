//! Entity to property map.

use serde::ser::{self, Impossible, Serialize};

use crate::error::{EntityError, Result};
use crate::timestamp;
use crate::value::{PropertyMap, PropertyValue};

/// Flatten an entity into a property map.
///
/// Scalar members become one property named after the member. Nested
/// structures contribute their members under the parent member's name as a
/// prefix, recursively. An absent (`None`) member contributes nothing.
///
/// # Errors
///
/// - [`EntityError::NotAnEntity`] if `entity` is not a struct
/// - [`EntityError::UnsupportedPropertyType`] for sequences, maps, tuples,
///   data-carrying enum variants and other unmappable members
/// - [`EntityError::DuplicateProperty`] if two members flatten to the same name
pub fn flatten<T: ?Sized + Serialize>(entity: &T) -> Result<PropertyMap> {
    let mut map = PropertyMap::new();
    entity.serialize(FieldSerializer {
        map: &mut map,
        key: String::new(),
        root: true,
    })?;
    Ok(map)
}

/// Serializes one member value under `key`.
///
/// At the root there is no member yet, so only structured values are
/// accepted.
struct FieldSerializer<'a> {
    map: &'a mut PropertyMap,
    key: String,
    root: bool,
}

impl FieldSerializer<'_> {
    fn put(self, value: PropertyValue) -> Result<()> {
        if self.root {
            return Err(EntityError::NotAnEntity(value.type_name()));
        }
        self.map.try_insert(self.key, value)
    }

    fn unsupported(&self, type_name: &'static str) -> EntityError {
        if self.root {
            EntityError::NotAnEntity(type_name)
        } else {
            EntityError::UnsupportedPropertyType {
                property: self.key.clone(),
                type_name,
            }
        }
    }

    fn timestamp<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        let mut scratch = PropertyMap::new();
        value.serialize(FieldSerializer {
            map: &mut scratch,
            key: self.key.clone(),
            root: false,
        })?;
        match scratch.remove(&self.key) {
            Some(PropertyValue::String(text)) => {
                let at = timestamp::parse(&text).map_err(|e| {
                    EntityError::Custom(format!("property '{}': {}", self.key, e))
                })?;
                self.put(PropertyValue::DateTime(at))
            }
            _ => Err(self.unsupported("timestamp without RFC 3339 text")),
        }
    }
}

impl<'a> ser::Serializer for FieldSerializer<'a> {
    type Ok = ();
    type Error = EntityError;

    type SerializeSeq = Impossible<(), EntityError>;
    type SerializeTuple = Impossible<(), EntityError>;
    type SerializeTupleStruct = Impossible<(), EntityError>;
    type SerializeTupleVariant = Impossible<(), EntityError>;
    type SerializeMap = Impossible<(), EntityError>;
    type SerializeStruct = StructFlattener<'a>;
    type SerializeStructVariant = Impossible<(), EntityError>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.put(PropertyValue::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.put(PropertyValue::Int32(i32::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.put(PropertyValue::Int32(i32::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.put(PropertyValue::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.put(PropertyValue::Int64(v))
    }

    fn serialize_i128(self, _v: i128) -> Result<()> {
        Err(self.unsupported("i128"))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.put(PropertyValue::Int32(i32::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.put(PropertyValue::Int32(i32::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.put(PropertyValue::Int64(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        match i64::try_from(v) {
            Ok(v) => self.put(PropertyValue::Int64(v)),
            Err(_) => Err(self.unsupported("u64 above i64::MAX")),
        }
    }

    fn serialize_u128(self, _v: u128) -> Result<()> {
        Err(self.unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.put(PropertyValue::Double(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.put(PropertyValue::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.put(PropertyValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.put(PropertyValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.put(PropertyValue::Binary(v.to_vec()))
    }

    fn serialize_none(self) -> Result<()> {
        if self.root {
            return Err(EntityError::NotAnEntity("none"));
        }
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Err(self.unsupported("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(self.unsupported("unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.put(PropertyValue::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        if name == timestamp::TOKEN {
            self.timestamp(value)
        } else {
            value.serialize(self)
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(self.unsupported("enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(self.unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(self.unsupported("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.unsupported("enum variant with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.unsupported("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(StructFlattener {
            map: self.map,
            prefix: self.key,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.unsupported("enum variant with data"))
    }
}

/// Writes the members of one struct level under a shared prefix.
struct StructFlattener<'a> {
    map: &'a mut PropertyMap,
    prefix: String,
}

impl ser::SerializeStruct for StructFlattener<'_> {
    type Ok = ();
    type Error = EntityError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        value.serialize(FieldSerializer {
            map: &mut *self.map,
            key: format!("{}{}", self.prefix, key),
            root: false,
        })
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Flags {
        a: u8,
        b: u32,
        c: f32,
        d: char,
        e: bool,
    }

    #[test]
    fn test_scalar_widening() {
        let map = flatten(&Flags { a: 1, b: 2, c: 0.5, d: 'x', e: true }).unwrap();
        assert_eq!(map.get("a"), Some(&PropertyValue::Int32(1)));
        assert_eq!(map.get("b"), Some(&PropertyValue::Int64(2)));
        assert_eq!(map.get("c"), Some(&PropertyValue::Double(0.5)));
        assert_eq!(map.get("d"), Some(&PropertyValue::String("x".into())));
        assert_eq!(map.get("e"), Some(&PropertyValue::Boolean(true)));
    }

    #[test]
    fn test_root_must_be_struct() {
        assert_eq!(flatten(&5i32).unwrap_err(), EntityError::NotAnEntity("Edm.Int32"));
        assert_eq!(flatten(&vec![1, 2]).unwrap_err(), EntityError::NotAnEntity("sequence"));
        assert_eq!(flatten(&Option::<Flags>::None).unwrap_err(), EntityError::NotAnEntity("none"));
    }

    #[test]
    fn test_large_u64_rejected() {
        #[derive(Serialize)]
        struct Big {
            n: u64,
        }

        assert!(flatten(&Big { n: 10 }).is_ok());
        let err = flatten(&Big { n: u64::MAX }).unwrap_err();
        assert!(err.is_unsupported());
    }
}
