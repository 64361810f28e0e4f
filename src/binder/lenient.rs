//! Lenient `serde` deserializer over a decoded body value.
//!
//! Values are coerced toward whatever the target type asks for: integral
//! floats become integers, numeric and boolean strings are parsed, numbers and
//! booleans stringify. Anything that cannot be coerced yields the zero value
//! of the requested type and records a [`Degradation`]. Struct fields are
//! looked up by serialized name; absent or `null` fields are zero-filled and
//! unknown source keys are ignored.

use std::borrow::Cow;
use std::cell::RefCell;
use std::str::FromStr;

use serde::de::{
    self, value::BorrowedStrDeserializer, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess,
    Visitor,
};
use serde::Deserializer;
use serde_json::{Map, Value};
use thiserror::Error;

use super::core::{parse_bool, BindError, Bound, Degradation};
use super::zero::Zero;

/// Deserialization failure, located by the path segments it unwound
/// through (innermost first).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub(crate) struct LenientError {
    message: String,
    at: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl LenientError {
    fn within(mut self, segment: Segment) -> Self {
        self.at.push(segment);
        self
    }

    /// Path from the root to the failing value.
    fn path(&self) -> Vec<Segment> {
        self.at.iter().rev().cloned().collect()
    }
}

impl de::Error for LenientError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self {
            message: msg.to_string(),
            at: Vec::new(),
        }
    }
}

fn render(root: &str, path: &[Segment]) -> String {
    let mut out = root.to_string();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

/// Drop the value at `path`: object entries are removed, array elements set
/// to `null`. False when the path does not lead to a value.
fn mask(value: &mut Value, path: &[Segment]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut node = value;
    for segment in parents {
        let next = match (segment, node) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return false,
        }
    }
    match (last, node) {
        (Segment::Key(key), Value::Object(map)) => map.remove(key).is_some(),
        (Segment::Index(index), Value::Array(items)) => match items.get_mut(*index) {
            Some(item) => {
                *item = Value::Null;
                true
            }
            None => false,
        },
        _ => false,
    }
}

fn node_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(node_count).sum::<usize>(),
        Value::Object(map) => 1 + map.values().map(node_count).sum::<usize>(),
        _ => 1,
    }
}

/// Bind `T` from `value`.
///
/// A value rejected by its type's own `Deserialize` impl is dropped (and so
/// bound as zero) and the bind retried, keeping every sibling. Each
/// node is masked at most once. A failure that masking cannot clear falls back
/// to the all-zero `T`.
///
/// # Errors
///
/// [`BindError::Unbindable`] when even the zero value cannot be built.
pub(crate) fn bind_lenient<T: DeserializeOwned>(value: &Value, root: &str) -> Result<Bound<T>, BindError> {
    let mut source = Cow::Borrowed(value);
    let mut masked: Vec<Vec<Segment>> = Vec::new();
    let mut rejected = Vec::new();

    let err = loop {
        let sink = RefCell::new(Vec::new());
        let err = match T::deserialize(Lenient::new(&source, root.to_string(), &sink)) {
            Ok(value) => {
                let mut degraded = sink.into_inner();
                degraded.append(&mut rejected);
                return Ok(Bound { value, degraded });
            }
            Err(err) => err,
        };
        let path = err.path();
        if masked.len() >= node_count(value) || masked.contains(&path) || !mask(source.to_mut(), &path) {
            break err;
        }
        rejected.push(Degradation::new(
            render(root, &path),
            format!("{err}; using zero value"),
        ));
        masked.push(path);
    };

    let mut degraded = rejected;
    let target = render(root, &err.path());
    degraded.push(Degradation::new(root, format!("{target}: {err}; using zero value")));
    match T::deserialize(Zero) {
        Ok(value) => Ok(Bound { value, degraded }),
        Err(zero_err) => Err(BindError::Unbindable {
            parameter: root.to_string(),
            type_name: std::any::type_name::<T>(),
            reason: format!("{target}: {err}; no zero value: {zero_err}"),
        }),
    }
}

pub(crate) struct Lenient<'de, 's> {
    value: &'de Value,
    path: String,
    sink: &'s RefCell<Vec<Degradation>>,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de, 's> Lenient<'de, 's> {
    pub(crate) fn new(value: &'de Value, path: String, sink: &'s RefCell<Vec<Degradation>>) -> Self {
        Self { value, path, sink }
    }

    fn child(&self, value: &'de Value, segment: std::fmt::Arguments<'_>) -> Self {
        Self {
            value,
            path: format!("{}{}", self.path, segment),
            sink: self.sink,
        }
    }

    fn degrade(&self, expected: &str) {
        let reason = format!("expected {expected}, found {}", kind(self.value));
        self.sink
            .borrow_mut()
            .push(Degradation::new(self.path.clone(), reason));
    }

    fn integer<T>(&self, expected: &str) -> T
    where
        T: TryFrom<i64> + TryFrom<u64> + FromStr + Default,
    {
        let converted = match self.value {
            Value::Null => return T::default(),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    T::try_from(i).ok()
                } else if let Some(u) = n.as_u64() {
                    T::try_from(u).ok()
                } else {
                    n.as_f64().and_then(|f| self.float_to_integer(f))
                }
            }
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        converted.unwrap_or_else(|| {
            self.degrade(expected);
            T::default()
        })
    }

    fn float_to_integer<T>(&self, f: f64) -> Option<T>
    where
        T: TryFrom<i64> + TryFrom<u64>,
    {
        let truncated = f.trunc();
        if f.fract() != 0.0 {
            self.sink.borrow_mut().push(Degradation::new(
                self.path.clone(),
                format!("fractional number {f} truncated to {truncated}"),
            ));
        }
        if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
            T::try_from(truncated as i64).ok()
        } else if truncated >= 0.0 && truncated < u64::MAX as f64 {
            T::try_from(truncated as u64).ok()
        } else {
            None
        }
    }

    fn float(&self, expected: &str) -> f64 {
        let converted = match self.value {
            Value::Null => return 0.0,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        converted.unwrap_or_else(|| {
            self.degrade(expected);
            0.0
        })
    }
}

macro_rules! lenient_integer {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                let n: $ty = self.integer(stringify!($ty));
                visitor.$visit(n)
            }
        )*
    };
}

impl<'de, 's> Deserializer<'de> for Lenient<'de, 's> {
    type Error = LenientError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else {
                    visitor.visit_f64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Array(_) => self.deserialize_seq(visitor),
            Value::Object(_) => self.deserialize_map(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let b = match self.value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::String(s) => parse_bool(s.trim()).unwrap_or_else(|| {
                self.degrade("bool");
                false
            }),
            _ => {
                self.degrade("bool");
                false
            }
        };
        visitor.visit_bool(b)
    }

    lenient_integer! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f32(self.float("f32") as f32)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_f64(self.float("f64"))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let c = match self.value {
            Value::Null => '\0',
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        self.degrade("single character");
                        '\0'
                    }
                }
            }
            _ => {
                self.degrade("single character");
                '\0'
            }
        };
        visitor.visit_char(c)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            Value::Null => visitor.visit_borrowed_str(""),
            _ => {
                self.degrade("string");
                visitor.visit_borrowed_str("")
            }
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            Value::Array(_) => self.deserialize_seq(visitor),
            Value::Null => visitor.visit_borrowed_bytes(&[]),
            _ => {
                self.degrade("bytes");
                visitor.visit_borrowed_bytes(&[])
            }
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let items: &'de [Value] = match self.value {
            Value::Array(items) => items,
            Value::Null => &[],
            _ => {
                self.degrade("array");
                &[]
            }
        };
        visitor.visit_seq(LenientSeq {
            parent: self,
            items,
            index: 0,
            len: items.len(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        let items: &'de [Value] = match self.value {
            Value::Array(items) => items,
            Value::Null => &[],
            _ => {
                self.degrade("array");
                &[]
            }
        };
        visitor.visit_seq(LenientSeq {
            parent: self,
            items,
            index: 0,
            len,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
        let object: &'de Map<String, Value> = match self.value {
            Value::Object(map) => map,
            Value::Null => EMPTY.get_or_init(Map::new),
            _ => {
                self.degrade("object");
                EMPTY.get_or_init(Map::new)
            }
        };
        visitor.visit_map(LenientMap {
            entries: object.iter(),
            pending: None,
            parent: self,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let object = match self.value {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => {
                self.degrade("object");
                None
            }
        };
        visitor.visit_map(LenientStruct {
            fields: fields.iter(),
            object,
            current: None,
            parent: self,
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value
            .deserialize_enum(name, variants, visitor)
            .map_err(de::Error::custom)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

struct LenientSeq<'de, 's> {
    parent: Lenient<'de, 's>,
    items: &'de [Value],
    index: usize,
    /// Elements to yield; positions past the source are zero-filled
    len: usize,
}

impl<'de, 's> SeqAccess<'de> for LenientSeq<'de, 's> {
    type Error = LenientError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error> {
        if self.index >= self.len {
            return Ok(None);
        }
        let index = self.index;
        self.index += 1;
        match self.items.get(index) {
            Some(item) => seed.deserialize(self.parent.child(item, format_args!("[{index}]"))),
            None => seed.deserialize(Zero),
        }
        .map(Some)
        .map_err(|e| e.within(Segment::Index(index)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len - self.index)
    }
}

struct LenientMap<'de, 's> {
    entries: serde_json::map::Iter<'de>,
    pending: Option<(&'de str, &'de Value)>,
    parent: Lenient<'de, 's>,
}

impl<'de, 's> MapAccess<'de> for LenientMap<'de, 's> {
    type Error = LenientError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some((key.as_str(), value));
                seed.deserialize(BorrowedStrDeserializer::new(key.as_str()))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        match self.pending.take() {
            Some((key, value)) => seed
                .deserialize(self.parent.child(value, format_args!(".{key}")))
                .map_err(|e| e.within(Segment::Key(key.to_string()))),
            None => Err(de::Error::custom("map value requested before key")),
        }
    }
}

struct LenientStruct<'de, 's> {
    fields: std::slice::Iter<'static, &'static str>,
    object: Option<&'de Map<String, Value>>,
    current: Option<(&'static str, Option<&'de Value>)>,
    parent: Lenient<'de, 's>,
}

impl<'de, 's> MapAccess<'de> for LenientStruct<'de, 's> {
    type Error = LenientError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error> {
        let Some(&field) = self.fields.next() else {
            return Ok(None);
        };
        let value = self
            .object
            .and_then(|object| object.get(field))
            .filter(|value| !value.is_null());
        self.current = Some((field, value));
        seed.deserialize(BorrowedStrDeserializer::new(field)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        match self.current.take() {
            Some((field, Some(value))) => seed
                .deserialize(self.parent.child(value, format_args!(".{field}")))
                .map_err(|e| e.within(Segment::Key(field.to_string()))),
            Some((field, None)) => seed
                .deserialize(Zero)
                .map_err(|e| e.within(Segment::Key(field.to_string()))),
            None => Err(de::Error::custom("struct value requested before field")),
        }
    }
}
