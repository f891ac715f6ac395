//! Platform data model: application identity and bound services.
//!
//! Shapes mirror the JSON the platform injects through `VCAP_APPLICATION` and
//! `VCAP_SERVICES`. Keys this crate does not interpret are kept in `extra` so
//! a resolved environment serializes back without loss.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A bound service's credentials, as supplied by the platform.
pub type Credentials = Map<String, Value>;

/// Read a credential field as a string.
///
/// Strings are returned as-is; numbers and booleans are rendered the way they
/// would print in JSON. Objects, arrays and `null` are not usable as strings.
pub fn credential_str(credentials: &Credentials, field: &str) -> Option<String> {
    match credentials.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string field; `null` or any non-string value reads as empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// A list of strings; non-string entries are dropped, anything else reads as empty.
fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_credentials<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Credentials>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => Some(map),
        _ => None,
    })
}

/// The platform's view of the running application.
///
/// Deserialization never fails on an object: fields of an unexpected type
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub uris: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl App {
    /// Identity used when the platform supplies none.
    pub fn local_default() -> Self {
        Self {
            name: "ignoreme".to_string(),
            host: "localhost".to_string(),
            uris: vec!["localhost".to_string()],
            extra: Map::new(),
        }
    }
}

/// One bound service instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_credentials")]
    pub credentials: Option<Credentials>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    pub fn new(name: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            credentials: Some(credentials),
            extra: Map::new(),
        }
    }
}

/// Bindings grouped by service type (`"p-mysql"`, `"user-provided"`, ...).
///
/// Group order follows the source document, which decides precedence when
/// bindings in different groups share a name. A group that is not a list
/// reads as empty and non-object bindings are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Services {
    groups: Vec<(String, Vec<Service>)>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group, replacing an existing group of the same type in place.
    pub fn insert(&mut self, label: impl Into<String>, bindings: Vec<Service>) {
        let label = label.into();
        match self.groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = bindings,
            None => self.groups.push((label, bindings)),
        }
    }

    /// Builder-style [`Services::insert`].
    pub fn with_group(mut self, label: impl Into<String>, bindings: Vec<Service>) -> Self {
        self.insert(label, bindings);
        self
    }

    pub fn get(&self, label: &str) -> Option<&[Service]> {
        self.groups
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, bindings)| bindings.as_slice())
    }

    /// Groups in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Service])> {
        self.groups.iter().map(|(l, b)| (l.as_str(), b.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for Services {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (label, bindings) in &self.groups {
            map.serialize_entry(label, bindings)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Services {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ServicesVisitor;

        impl<'de> Visitor<'de> for ServicesVisitor {
            type Value = Services;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of service type to a list of bindings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Services, A::Error> {
                let mut services = Services::new();
                while let Some((label, bindings)) = access.next_entry::<String, serde_json::Value>()? {
                    let bindings = match bindings {
                        Value::Array(items) => items
                            .into_iter()
                            .filter_map(|item| serde_json::from_value::<Service>(item).ok())
                            .collect(),
                        _ => Vec::new(),
                    };
                    services.insert(label, bindings);
                }
                Ok(services)
            }
        }

        deserializer.deserialize_map(ServicesVisitor)
    }
}

/// Local override document: `{ "application": {...}, "services": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vcap {
    #[serde(default)]
    pub application: Option<App>,
    #[serde(default)]
    pub services: Option<Services>,
}
