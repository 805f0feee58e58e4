//! The closed set of value kinds a handler can hand back to the bridge.
//!
//! Handlers never return arbitrary runtime objects. Every domain type that
//! can appear in a result implements [`Encode`] and maps itself onto one of
//! the [`Value`] variants explicitly. Anything without an `Encode` impl
//! simply cannot be returned, so the encoder never meets an unknown type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A handler result, before JSON encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// Opaque binary data.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Key-unique mapping with insertion order.
    Map(Fields),
    /// A structured platform object (message, user, chat, ...).
    Record(Record),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Ordered, key-unique field list.
///
/// Re-inserting an existing key replaces its value in place, so the first
/// insertion decides the position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    /// Create an empty field list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Returns the previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Builder-style insert of anything encodable.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Encode) -> Self {
        let _ = self.insert(key, value.to_value());
        self
    }

    /// Look up a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            let _ = fields.insert(k, v);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A typed platform object: a type name plus its canonical fields.
///
/// Encodes as an object whose first key is `"_"` holding the type name.
/// `"_"` is reserved: a field with that name is never emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Fields,
}

impl Record {
    /// Start a record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Fields::new(),
        }
    }

    /// Builder-style field append.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Encode) -> Self {
        let _ = self.fields.insert(name, value.to_value());
        self
    }

    /// The platform type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The record's fields.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

/// Binary blob wrapper, so `Vec<u8>` can stay an ordinary list elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

/// Explicit conversion of a domain type into a [`Value`].
pub trait Encode {
    /// Map `self` onto the closed value model.
    fn to_value(&self) -> Value;
}

impl Encode for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl Encode for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

impl Encode for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! encode_lossless_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }
        )*
    };
}

encode_lossless_int!(i8, i16, i32, i64, u8, u16, u32);

// Values beyond i64 keep every digit as text instead of rounding through f64.
macro_rules! encode_wide_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn to_value(&self) -> Value {
                    i64::try_from(*self).map_or_else(|_| Value::String(self.to_string()), Value::Int)
                }
            }
        )*
    };
}

encode_wide_int!(u64, usize, isize);

impl Encode for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Encode for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Encode for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl Encode for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Encode for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl Encode for Bytes {
    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }
}

impl Encode for Fields {
    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }
}

impl Encode for Record {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Encode::to_value)
    }
}

impl<T: Encode> Encode for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Encode::to_value).collect())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<V: Encode> Encode for BTreeMap<String, V> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

/// Raw JSON maps onto the structural variants one to one.
impl Encode for serde_json::Value {
    fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or_else(|| Value::String(n.to_string())),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => items.as_slice().to_value(),
            Self::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}
