//! Tolerant JSON document stored in a TEXT column.
//!
//! Character sheets keep their free-form blocks (attributes, equipment,
//! spells, ...) as JSON text. Legacy rows may hold empty strings or
//! garbage; those decode to `Null` instead of failing the whole row.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, Type, ValueRef};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FlexJson {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    #[default]
    Null,
}

impl FlexJson {
    pub fn empty_object() -> Self {
        FlexJson::Object(Map::new())
    }

    pub fn empty_array() -> Self {
        FlexJson::Array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlexJson::Null)
    }

    /// Never fails: anything that is not an object or array is `Null`.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => FlexJson::from(value),
            Err(_) => FlexJson::Null,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            FlexJson::Object(map) => Value::Object(map.clone()).to_string(),
            FlexJson::Array(items) => Value::Array(items.clone()).to_string(),
            FlexJson::Null => "null".to_owned(),
        }
    }

    /// Replaces `Null` with `fallback`.
    pub fn or(self, fallback: FlexJson) -> Self {
        if self.is_null() {
            fallback
        } else {
            self
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            FlexJson::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<Value> for FlexJson {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => FlexJson::Object(map),
            Value::Array(items) => FlexJson::Array(items),
            _ => FlexJson::Null,
        }
    }
}

impl Serialize for FlexJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlexJson::Object(map) => map.serialize(serializer),
            FlexJson::Array(items) => items.serialize(serializer),
            FlexJson::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for FlexJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FlexJson::from)
    }
}

impl Type<Postgres> for FlexJson {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for FlexJson {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Postgres>>::encode_by_ref(&self.to_text(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for FlexJson {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        if value.is_null() {
            return Ok(FlexJson::Null);
        }
        let text = <&str as Decode<'r, Postgres>>::decode(value)?;
        Ok(FlexJson::from_text(text))
    }
}
