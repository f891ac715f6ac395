//! Name-keyed service lookup over grouped bindings.

use regex::Regex;

use crate::model::{Credentials, Service, Services};

/// How to pick a binding by name.
#[derive(Debug, Clone)]
pub enum ServiceSpec {
    /// Binding name must equal this string.
    Exact(String),
    /// Binding name must match this expression anywhere (unanchored).
    Pattern(Regex),
}

impl ServiceSpec {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ServiceSpec::Exact(expected) => name == expected,
            ServiceSpec::Pattern(re) => re.is_match(name),
        }
    }
}

impl From<&str> for ServiceSpec {
    fn from(name: &str) -> Self {
        ServiceSpec::Exact(name.to_string())
    }
}

impl From<String> for ServiceSpec {
    fn from(name: String) -> Self {
        ServiceSpec::Exact(name)
    }
}

impl From<Regex> for ServiceSpec {
    fn from(re: Regex) -> Self {
        ServiceSpec::Pattern(re)
    }
}

/// Bindings from every service group, keyed by binding name.
///
/// When two bindings share a name the later one wins, but the key keeps the
/// position where it was first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDirectory {
    entries: Vec<Service>,
}

impl ServiceDirectory {
    /// Flatten groups in document order, then bindings in sequence order.
    pub fn from_services(services: &Services) -> Self {
        let mut entries: Vec<Service> = Vec::new();
        for (_label, bindings) in services.iter() {
            for binding in bindings {
                match entries.iter_mut().find(|s| s.name == binding.name) {
                    Some(slot) => *slot = binding.clone(),
                    None => entries.push(binding.clone()),
                }
            }
        }
        Self { entries }
    }

    /// First binding whose name satisfies `spec`, in directory order.
    pub fn find(&self, spec: &ServiceSpec) -> Option<&Service> {
        self.entries.iter().find(|s| spec.matches(&s.name))
    }

    /// Credentials of the matching binding.
    ///
    /// `Some(empty)` when the binding exists without credentials, `None` when
    /// nothing matches.
    pub fn credentials(&self, spec: &ServiceSpec) -> Option<Credentials> {
        self.find(spec)
            .map(|s| s.credentials.clone().unwrap_or_default())
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.entries.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl serde::Serialize for ServiceDirectory {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for service in &self.entries {
            map.serialize_entry(&service.name, service)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds(value: serde_json::Value) -> Credentials {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Services {
        Services::new()
            .with_group(
                "p-mysql",
                vec![
                    Service::new("orders-db", creds(json!({"uri": "mysql://h/orders"}))),
                    Service::new("users-db", creds(json!({"uri": "mysql://h/users"}))),
                ],
            )
            .with_group(
                "user-provided",
                vec![Service::new("smtp", creds(json!({"host": "mail"})))],
            )
    }

    #[test]
    fn test_flatten_union_of_names() {
        let dir = ServiceDirectory::from_services(&sample());
        let names: Vec<&str> = dir.names().collect();
        assert_eq!(names, vec!["orders-db", "users-db", "smtp"]);
        assert_eq!(
            dir.get("smtp").unwrap(),
            &sample().get("user-provided").unwrap()[0]
        );
    }

    #[test]
    fn test_flatten_later_group_overwrites() {
        let services = Services::new()
            .with_group("a", vec![Service::new("shared", creds(json!({"v": "first"})))])
            .with_group("b", vec![Service::new("other", Credentials::new())])
            .with_group("c", vec![Service::new("shared", creds(json!({"v": "second"})))]);
        let dir = ServiceDirectory::from_services(&services);
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.names().collect::<Vec<_>>(), vec!["shared", "other"]);
        let shared = dir.get("shared").unwrap();
        assert_eq!(shared.credentials.as_ref().unwrap()["v"], "second");
    }

    #[test]
    fn test_flatten_empty() {
        assert!(ServiceDirectory::from_services(&Services::new()).is_empty());
    }

    #[test]
    fn test_find_exact() {
        let dir = ServiceDirectory::from_services(&sample());
        assert_eq!(dir.find(&"users-db".into()).unwrap().name, "users-db");
        assert!(dir.find(&"users".into()).is_none());
        assert!(dir.find(&"USERS-DB".into()).is_none());
    }

    #[test]
    fn test_find_pattern_first_in_order() {
        let dir = ServiceDirectory::from_services(&sample());
        let spec = ServiceSpec::from(Regex::new("-db$").unwrap());
        assert_eq!(dir.find(&spec).unwrap().name, "orders-db");

        let spec = ServiceSpec::from(Regex::new("^mail").unwrap());
        assert!(dir.find(&spec).is_none());
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let dir = ServiceDirectory::from_services(&sample());
        let spec = ServiceSpec::from(Regex::new("mt").unwrap());
        assert_eq!(dir.find(&spec).unwrap().name, "smtp");
    }

    #[test]
    fn test_credentials_signals() {
        let services = sample().with_group(
            "bare",
            vec![Service {
                name: "no-creds".to_string(),
                credentials: None,
                extra: Default::default(),
            }],
        );
        let dir = ServiceDirectory::from_services(&services);
        assert_eq!(
            dir.credentials(&"smtp".into()),
            Some(creds(json!({"host": "mail"})))
        );
        assert_eq!(dir.credentials(&"no-creds".into()), Some(Credentials::new()));
        assert_eq!(dir.credentials(&"missing".into()), None);
    }
}
