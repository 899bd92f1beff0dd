use crate::error::DbError;
use crate::udbc::value::Value;
use serde::Serialize;
use serde::ser::{
    Impossible, SerializeMap, SerializeSeq, SerializeStruct, SerializeTuple, SerializeTupleStruct,
    Serializer,
};
use std::collections::HashMap;

/// Turns call-site arguments into a [`Value`] tree.
///
/// Arguments are structs of named parameters, scalars, options and lists.
/// Enum variants carrying data have no column representation and are refused.
struct ArgSerializer;

fn unsupported(shape: &str) -> DbError {
    DbError::Bind(format!("{} cannot be bound as a statement parameter", shape))
}

impl Serializer for ArgSerializer {
    type Ok = Value;
    type Error = DbError;
    type SerializeSeq = ArgList;
    type SerializeTuple = ArgList;
    type SerializeTupleStruct = ArgList;
    type SerializeTupleVariant = Impossible<Value, DbError>;
    type SerializeMap = ArgMap;
    type SerializeStruct = ArgMap;
    type SerializeStructVariant = Impossible<Value, DbError>;

    fn serialize_bool(self, v: bool) -> Result<Value, DbError> {
        Ok(Value::Bool(v))
    }
    fn serialize_i8(self, v: i8) -> Result<Value, DbError> {
        Ok(Value::I16(v.into()))
    }
    fn serialize_i16(self, v: i16) -> Result<Value, DbError> {
        Ok(Value::I16(v))
    }
    fn serialize_i32(self, v: i32) -> Result<Value, DbError> {
        Ok(Value::I32(v))
    }
    fn serialize_i64(self, v: i64) -> Result<Value, DbError> {
        Ok(Value::I64(v))
    }
    fn serialize_u8(self, v: u8) -> Result<Value, DbError> {
        Ok(Value::I16(v.into()))
    }
    fn serialize_u16(self, v: u16) -> Result<Value, DbError> {
        Ok(Value::I32(v.into()))
    }
    fn serialize_u32(self, v: u32) -> Result<Value, DbError> {
        Ok(Value::I64(v.into()))
    }
    fn serialize_u64(self, v: u64) -> Result<Value, DbError> {
        i64::try_from(v)
            .map(Value::I64)
            .map_err(|_| DbError::Bind(format!("{} does not fit in BIGINT", v)))
    }
    fn serialize_f32(self, v: f32) -> Result<Value, DbError> {
        Ok(Value::F32(v))
    }
    fn serialize_f64(self, v: f64) -> Result<Value, DbError> {
        Ok(Value::F64(v))
    }
    fn serialize_char(self, v: char) -> Result<Value, DbError> {
        Ok(Value::Str(v.into()))
    }
    fn serialize_str(self, v: &str) -> Result<Value, DbError> {
        Ok(Value::Str(v.into()))
    }
    fn serialize_bytes(self, v: &[u8]) -> Result<Value, DbError> {
        Ok(Value::Bytes(v.into()))
    }
    fn serialize_none(self) -> Result<Value, DbError> {
        Ok(Value::Null)
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, DbError> {
        value.serialize(self)
    }

    // `()` stands for "no arguments".
    fn serialize_unit(self) -> Result<Value, DbError> {
        Ok(Value::List(Vec::new()))
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<Value, DbError> {
        Ok(Value::Null)
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<Value, DbError> {
        Ok(Value::Str(variant.into()))
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<Value, DbError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _: u32,
        variant: &'static str,
        _: &T,
    ) -> Result<Value, DbError> {
        Err(unsupported(&format!("{}::{}", name, variant)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ArgList, DbError> {
        Ok(ArgList(Vec::with_capacity(len.unwrap_or_default())))
    }
    fn serialize_tuple(self, len: usize) -> Result<ArgList, DbError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_struct(self, _: &'static str, len: usize) -> Result<ArgList, DbError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, DbError> {
        Err(unsupported(&format!("{}::{}", name, variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<ArgMap, DbError> {
        Ok(ArgMap::with_capacity(len.unwrap_or_default()))
    }
    fn serialize_struct(self, _: &'static str, len: usize) -> Result<ArgMap, DbError> {
        Ok(ArgMap::with_capacity(len))
    }
    fn serialize_struct_variant(
        self,
        name: &'static str,
        _: u32,
        variant: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, DbError> {
        Err(unsupported(&format!("{}::{}", name, variant)))
    }
}

struct ArgList(Vec<Value>);

impl ArgList {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
        self.0.push(value.serialize(ArgSerializer)?);
        Ok(())
    }
}

impl SerializeSeq for ArgList {
    type Ok = Value;
    type Error = DbError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, DbError> {
        Ok(Value::List(self.0))
    }
}

impl SerializeTuple for ArgList {
    type Ok = Value;
    type Error = DbError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, DbError> {
        Ok(Value::List(self.0))
    }
}

impl SerializeTupleStruct for ArgList {
    type Ok = Value;
    type Error = DbError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, DbError> {
        Ok(Value::List(self.0))
    }
}

/// Named parameters, from a struct or a string-keyed map.
struct ArgMap {
    params: HashMap<String, Value>,
    pending: Option<String>,
}

impl ArgMap {
    fn with_capacity(len: usize) -> Self {
        Self {
            params: HashMap::with_capacity(len),
            pending: None,
        }
    }

    fn insert<T: ?Sized + Serialize>(&mut self, name: String, value: &T) -> Result<(), DbError> {
        let value = value.serialize(ArgSerializer)?;
        if self.params.insert(name.clone(), value).is_some() {
            return Err(DbError::Bind(format!("parameter '{}' given twice", name)));
        }
        Ok(())
    }
}

impl SerializeMap for ArgMap {
    type Ok = Value;
    type Error = DbError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), DbError> {
        match key.serialize(ArgSerializer)? {
            Value::Str(name) => {
                self.pending = Some(name);
                Ok(())
            }
            other => Err(DbError::Bind(format!("parameter names must be strings, got {:?}", other))),
        }
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DbError> {
        let name = self
            .pending
            .take()
            .ok_or_else(|| DbError::Bind("map value without a key".into()))?;
        self.insert(name, value)
    }
    fn end(self) -> Result<Value, DbError> {
        Ok(Value::Map(self.params))
    }
}

impl SerializeStruct for ArgMap {
    type Ok = Value;
    type Error = DbError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DbError> {
        self.insert(key.to_string(), value)
    }
    fn end(self) -> Result<Value, DbError> {
        Ok(Value::Map(self.params))
    }
}

/// Serializes statement arguments; failures surface as [`DbError::Bind`].
pub fn to_value<T: Serialize + ?Sized>(args: &T) -> Result<Value, DbError> {
    args.serialize(ArgSerializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Args<'a> {
        zip: i32,
        categories: &'a [String],
        note: Option<&'a str>,
    }

    #[test]
    fn test_struct_becomes_map() {
        let categories = vec!["Pizza".to_string()];
        let v = to_value(&Args {
            zip: 15203,
            categories: &categories,
            note: None,
        })
        .unwrap();
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(map["zip"], Value::I32(15203));
        assert_eq!(map["categories"], Value::List(vec![Value::Str("Pizza".into())]));
        assert_eq!(map["note"], Value::Null);
    }

    #[test]
    fn test_string_keyed_map() {
        let mut args = BTreeMap::new();
        args.insert("state", "PA");
        let Value::Map(map) = to_value(&args).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["state"], Value::Str("PA".into()));

        let mut numbered = BTreeMap::new();
        numbered.insert(1, "PA");
        assert!(matches!(to_value(&numbered), Err(DbError::Bind(_))));
    }

    #[test]
    fn test_unit_is_empty_list() {
        assert_eq!(to_value(&()).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_chrono_serializes_as_string() {
        let dt = NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(to_value(&dt).unwrap(), Value::Str("2020-01-02T03:04:05".into()));
    }

    #[test]
    fn test_u64_overflow_is_an_error() {
        assert!(matches!(to_value(&u64::MAX), Err(DbError::Bind(_))));
    }

    #[derive(Serialize)]
    enum Filter {
        Everything,
        Zip(i32),
        Around { zip: i32 },
    }

    #[test]
    fn test_only_unit_variants_bind() {
        assert_eq!(to_value(&Filter::Everything).unwrap(), Value::Str("Everything".into()));
        assert!(matches!(to_value(&Filter::Zip(15203)), Err(DbError::Bind(_))));
        assert!(matches!(to_value(&Filter::Around { zip: 15203 }), Err(DbError::Bind(_))));
    }
}
