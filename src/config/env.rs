//! Environment variable overrides.
//!
//! Fields of the target are addressed as `{PREFIX}_{FIELD}`, with nested
//! structs adding one segment per level: a loader named `myapp` binds
//! `server.port` from `MYAPP_SERVER_PORT`. Every segment is converted to
//! SHOUTY_SNAKE_CASE, so `logLevel` and `log_level` both map to `LOG_LEVEL`.
//!
//! Binding re-deserializes the target through `EnvDeserializer`, which
//! walks the fields each struct declares. A variable that is set is parsed
//! into whatever type the field asks for (`u16`, `Option<String>`,
//! `Vec<u32>` from `1,2,3`, ...); every other field keeps its current value.

use crate::error::EnvError;
use heck::ToShoutySnakeCase;
use serde::Serialize;
use serde::de::value::StringDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess,
    Visitor,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Environment lookup capability.
pub trait Environment: fmt::Debug + Send + Sync {
    /// Value of `key`, or `None` when unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Variable prefix for a logical configuration name (`my-app` -> `MY_APP`).
pub fn env_prefix(name: &str) -> String {
    name.to_shouty_snake_case()
}

/// Apply environment overrides to `target`.
///
/// On error `target` is left as it was.
pub fn bind<T>(prefix: &str, env: &dyn Environment, target: &mut T) -> Result<(), EnvError>
where
    T: Serialize + DeserializeOwned,
{
    let current = serde_json::to_value(&*target).map_err(EnvError::Capture)?;
    let deserializer = EnvDeserializer {
        value: current,
        prefix: Some(prefix.to_string()),
        env,
    };
    *target = T::deserialize(deserializer).map_err(EnvError::Assign)?;
    Ok(())
}

/// Deserializes a value from its current JSON form, replacing any struct
/// field that has a matching environment variable.
struct EnvDeserializer<'a> {
    value: Value,
    /// `None` below keys the struct does not declare; nothing binds there.
    prefix: Option<String>,
    env: &'a dyn Environment,
}

macro_rules! forward_to_value {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            self.value.$method(visitor)
        }
    )*};
}

impl<'de, 'a> Deserializer<'de> for EnvDeserializer<'a> {
    type Error = serde_json::Error;

    forward_to_value! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_unit deserialize_seq deserialize_map
        deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value.deserialize_tuple(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value.deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.value.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let (mut current, prefix) = match (self.value, self.prefix) {
            (Value::Object(map), Some(prefix)) => (map, prefix),
            (other, _) => return other.deserialize_struct(name, fields, visitor),
        };

        let mut entries = Vec::with_capacity(current.len() + fields.len());
        for &field in fields {
            let var = format!("{}_{}", prefix, field.to_shouty_snake_case());
            if let Some(raw) = self.env.var(&var) {
                debug!(var = %var, field, "Applying environment override");
                current.remove(field);
                entries.push((field.to_string(), Entry::Raw(RawValue { var, raw })));
            } else if let Some(value) = current.remove(field) {
                entries.push((
                    field.to_string(),
                    Entry::Node(EnvDeserializer {
                        value,
                        prefix: Some(var),
                        env: self.env,
                    }),
                ));
            }
        }
        // Keys the struct does not declare go back unchanged so serde can
        // reject or ignore them as the type dictates.
        for (key, value) in current {
            let node = EnvDeserializer {
                value,
                prefix: None,
                env: self.env,
            };
            entries.push((key, Entry::Node(node)));
        }

        visitor.visit_map(EntryMap {
            entries: entries.into_iter(),
            pending: None,
        })
    }
}

enum Entry<'a> {
    Raw(RawValue),
    Node(EnvDeserializer<'a>),
}

struct EntryMap<'a> {
    entries: std::vec::IntoIter<(String, Entry<'a>)>,
    pending: Option<Entry<'a>>,
}

impl<'de, 'a> MapAccess<'de> for EntryMap<'a> {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.entries.next() {
            Some((key, entry)) => {
                self.pending = Some(entry);
                let key: StringDeserializer<serde_json::Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<S: DeserializeSeed<'de>>(&mut self, seed: S) -> Result<S::Value, Self::Error> {
        match self.pending.take() {
            Some(Entry::Raw(raw)) => seed.deserialize(raw),
            Some(Entry::Node(node)) => seed.deserialize(node),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }
}

/// The text of one environment variable, parsed on demand into the type the
/// field requests.
struct RawValue {
    var: String,
    raw: String,
}

impl RawValue {
    fn invalid(&self, expected: &str) -> serde_json::Error {
        de::Error::custom(format!(
            "assigning {}: converting '{}' to {}",
            self.var, self.raw, expected
        ))
    }

    fn parse_bool(&self) -> Option<bool> {
        match self.raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    /// Structured values (maps, structs) are accepted as inline JSON.
    fn parse_json(&self, expected: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.raw).map_err(|_| self.invalid(expected))
    }
}

macro_rules! parse_raw {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            let parsed = self
                .raw
                .trim()
                .parse::<$ty>()
                .map_err(|_| self.invalid(stringify!($ty)))?;
            visitor.$visit(parsed)
        }
    )*};
}

impl<'de> Deserializer<'de> for RawValue {
    type Error = serde_json::Error;

    parse_raw! {
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_i128 => i128, visit_i128;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_u128 => u128, visit_u128;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
        deserialize_char => char, visit_char;
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.raw)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.parse_bool() {
            Some(b) => visitor.visit_bool(b),
            None => Err(self.invalid("bool")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.raw)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.raw)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.raw)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_byte_buf(self.raw.into_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_byte_buf(self.raw.into_bytes())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
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

    /// Comma-separated; an empty (or blank) value is an empty list.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let items: Vec<String> = if self.raw.trim().is_empty() {
            Vec::new()
        } else {
            self.raw.split(',').map(|s| s.trim().to_string()).collect()
        };
        visitor.visit_seq(RawSeq {
            var: self.var,
            items: items.into_iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.parse_json("map")?.deserialize_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.parse_json(name)?
            .deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let variant: StringDeserializer<serde_json::Error> = self.raw.into_deserializer();
        visitor.visit_enum(variant)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

struct RawSeq {
    var: String,
    items: std::vec::IntoIter<String>,
}

impl<'de> SeqAccess<'de> for RawSeq {
    type Error = serde_json::Error;

    fn next_element_seed<S: DeserializeSeed<'de>>(
        &mut self,
        seed: S,
    ) -> Result<Option<S::Value>, Self::Error> {
        match self.items.next() {
            Some(raw) => seed
                .deserialize(RawValue {
                    var: self.var.clone(),
                    raw,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}
