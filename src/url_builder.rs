//! Build connection URLs from a bound service's credentials.
//!
//! A caller names a binding and, optionally, a set of replacements. The base
//! URL comes from the binding's `url` (or `uri`) credential; each replacement
//! key then overwrites one URL component with a value taken from another
//! credential field.
//!
//! Note the asymmetry kept from the established behavior: apart from `url`
//! and `auth`, the replacement *key* selects the credential field, the
//! replacement value is not consulted.

use std::str::FromStr;

use serde::Deserialize;
use url::{Position, Url};

use crate::model::{Credentials, credential_str};
use crate::services::{ServiceDirectory, ServiceSpec};

/// Value attached to a replacement key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Replacement {
    /// A credential field name.
    Field(String),
    /// `[user_field, password_field]`, only meaningful for `auth`.
    Pair(String, String),
}

/// Ordered replacement set, e.g. `{"auth": ["username", "password"], "pathname": "db"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    entries: Vec<(String, Replacement)>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn set(mut self, key: impl Into<String>, value: Replacement) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Read the base URL from `field` instead of `url`/`uri`.
    pub fn url_field(self, field: impl Into<String>) -> Self {
        self.set("url", Replacement::Field(field.into()))
    }

    /// Replace userinfo with `credentials[user_field]:credentials[password_field]`.
    pub fn auth(self, user_field: impl Into<String>, password_field: impl Into<String>) -> Self {
        self.set(
            "auth",
            Replacement::Pair(user_field.into(), password_field.into()),
        )
    }

    /// Replace the component named `key` from `credentials[key]`.
    pub fn component(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, Replacement::Field(value.into()))
    }

    pub fn get(&self, key: &str) -> Option<&Replacement> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Working copy with `key` dropped; `self` is left untouched.
    fn without(&self, key: &str) -> Replacements {
        Replacements {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Replacements {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Order matters, so go through a sequence of entries rather than a HashMap.
        struct EntriesVisitor;

        impl<'de> serde::de::Visitor<'de> for EntriesVisitor {
            type Value = Replacements;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of URL component to credential field")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<Replacements, A::Error> {
                let mut replacements = Replacements::new();
                while let Some((key, value)) = access.next_entry::<String, Replacement>()? {
                    replacements = replacements.set(key, value);
                }
                Ok(replacements)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// URL components a replacement may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlComponent {
    Auth,
    Hash,
    Host,
    Hostname,
    Href,
    Path,
    Pathname,
    Protocol,
    Search,
}

impl FromStr for UrlComponent {
    type Err = ();

    fn from_str(key: &str) -> Result<Self, ()> {
        Ok(match key {
            "auth" => UrlComponent::Auth,
            "hash" => UrlComponent::Hash,
            "host" => UrlComponent::Host,
            "hostname" => UrlComponent::Hostname,
            "href" => UrlComponent::Href,
            "path" => UrlComponent::Path,
            "pathname" => UrlComponent::Pathname,
            "protocol" => UrlComponent::Protocol,
            "search" => UrlComponent::Search,
            _ => return Err(()),
        })
    }
}

/// Build a URL for the binding matching `spec`.
///
/// Returns `""` when no binding matches or it carries no usable base URL.
/// With no replacements besides `url`, the stored URL is returned verbatim.
pub fn build_url(
    directory: &ServiceDirectory,
    spec: &ServiceSpec,
    replacements: &Replacements,
) -> String {
    let Some(credentials) = directory.credentials(spec) else {
        return String::new();
    };

    let Some(base) = base_url(&credentials, replacements) else {
        return String::new();
    };

    let working = replacements.without("url");
    if working.is_empty() {
        return base;
    }

    let mut url = match Url::parse(&base) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "service URL is not parseable, returning it unmodified");
            return base;
        }
    };

    for (key, value) in &working.entries {
        let Ok(component) = key.parse::<UrlComponent>() else {
            tracing::debug!(key = %key, "ignoring unrecognized replacement");
            continue;
        };
        if let Err(reason) = apply(&mut url, component, key, value, &credentials) {
            tracing::warn!(key = %key, reason, "replacement not applied");
        }
    }

    url.to_string()
}

fn base_url(credentials: &Credentials, replacements: &Replacements) -> Option<String> {
    match replacements.get("url") {
        Some(Replacement::Field(field)) if !field.is_empty() => credential_str(credentials, field),
        _ => credential_str(credentials, "url")
            .filter(|u| !u.is_empty())
            .or_else(|| credential_str(credentials, "uri")),
    }
    .filter(|u| !u.is_empty())
}

fn apply(
    url: &mut Url,
    component: UrlComponent,
    key: &str,
    value: &Replacement,
    credentials: &Credentials,
) -> Result<(), &'static str> {
    let field = || credential_str(credentials, key).ok_or("no credential field with that name");

    match component {
        UrlComponent::Auth => {
            let Replacement::Pair(user_field, password_field) = value else {
                return Err("auth expects [user_field, password_field]");
            };
            let user = credential_str(credentials, user_field).unwrap_or_default();
            let password = credential_str(credentials, password_field).unwrap_or_default();
            url.set_username(&user)
                .map_err(|_| "URL cannot carry credentials")?;
            let password = Some(password.as_str()).filter(|p| !p.is_empty());
            url.set_password(password)
                .map_err(|_| "URL cannot carry credentials")?;
        }
        UrlComponent::Hash => {
            let new_value = field()?;
            let fragment = new_value.trim_start_matches('#');
            url.set_fragment(Some(fragment).filter(|f| !f.is_empty()));
        }
        UrlComponent::Host => {
            let new_value = field()?;
            let (host, port) = split_host_port(&new_value);
            url.set_host(Some(host)).map_err(|_| "invalid host")?;
            url.set_port(port).map_err(|_| "URL cannot carry a port")?;
        }
        UrlComponent::Hostname => {
            url.set_host(Some(field()?.as_str()))
                .map_err(|_| "invalid hostname")?;
        }
        UrlComponent::Href => {
            *url = Url::parse(&field()?).map_err(|_| "href is not a valid URL")?;
        }
        UrlComponent::Path => {
            let new_value = field()?;
            let (path, query) = match new_value.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (new_value.as_str(), None),
            };
            url.set_path(path);
            url.set_query(query);
        }
        UrlComponent::Pathname => url.set_path(&field()?),
        UrlComponent::Protocol => {
            let new_value = field()?;
            let scheme = new_value.trim_end_matches(':');
            if url.set_scheme(scheme).is_err() {
                // Switching between special (http, file, ...) and other
                // schemes is refused by `set_scheme`; rebuild the text instead.
                let rebuilt = format!("{scheme}{}", &url[Position::AfterScheme..]);
                *url = Url::parse(&rebuilt).map_err(|_| "invalid scheme")?;
            }
        }
        UrlComponent::Search => {
            let new_value = field()?;
            let query = new_value.trim_start_matches('?');
            url.set_query(Some(query).filter(|q| !q.is_empty()));
        }
    }
    Ok(())
}

/// Split `host[:port]`; a bracketed IPv6 literal keeps its colons.
fn split_host_port(value: &str) -> (&str, Option<u16>) {
    match value.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (value, None),
        },
        _ => (value, None),
    }
}
