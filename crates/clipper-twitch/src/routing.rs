//! Endpoint definitions and the route registry.
//!
//! An [`Endpoint`] declares a base address, a path suffix and the names of
//! the query parameters it accepts. The [`RouteRegistry`] maps logical route
//! names to endpoints and builds concrete request URLs, rejecting calls that
//! omit required parameters and dropping any parameter the endpoint does not
//! declare.
//!
//! The registry is populated once at startup and is read-only afterwards, so
//! it can be shared between concurrent curation runs behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use url::Url;

use crate::error::{TwitchError, TwitchResult};

/// Query parameters for a request, keyed by name.
pub type Query = BTreeMap<String, String>;

/// Build a [`Query`] from key/value pairs.
pub fn query<K, V, I>(pairs: I) -> Query
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// =============================================================================
// Trailing slash policy
// =============================================================================

/// Registry-wide treatment of the trailing path separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingSlash {
    /// Always end the path with `/`.
    Append,
    /// Never end the path with `/` (except for the root path).
    #[default]
    Strip,
    /// Keep the path exactly as declared.
    Preserve,
}

impl TrailingSlash {
    /// Parse from a configuration string, returning the default if invalid.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "append" | "true" | "yes" => Self::Append,
            "preserve" | "keep" => Self::Preserve,
            _ => Self::Strip,
        }
    }

    fn apply(self, path: &str) -> String {
        match self {
            Self::Append if !path.ends_with('/') => format!("{}/", path),
            Self::Strip => {
                let trimmed = path.trim_end_matches('/');
                if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed.to_string()
                }
            }
            _ => path.to_string(),
        }
    }
}

// =============================================================================
// Endpoint
// =============================================================================

/// A single API endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
    path_suffix: String,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
}

/// Builder for [`Endpoint`]; validation happens in [`EndpointBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct EndpointBuilder {
    base_address: String,
    path_suffix: String,
    required: Vec<String>,
    optional: Vec<String>,
}

impl EndpointBuilder {
    /// Declare required query parameters.
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare optional query parameters.
    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional.extend(names.into_iter().map(Into::into));
        self
    }

    /// Validate and build the endpoint.
    pub fn build(self) -> TwitchResult<Endpoint> {
        let base_address = self.base_address.trim();
        let path_suffix = self.path_suffix.trim();

        if base_address.is_empty() {
            return Err(TwitchError::configuration("endpoint base address is empty"));
        }
        if path_suffix.is_empty() {
            return Err(TwitchError::configuration(format!(
                "endpoint path suffix is empty for {}",
                base_address
            )));
        }

        let base = Url::parse(base_address).map_err(|e| {
            TwitchError::configuration(format!("invalid base address {}: {}", base_address, e))
        })?;
        if base.cannot_be_a_base() || base.query().is_some() || base.fragment().is_some() {
            return Err(TwitchError::configuration(format!(
                "base address must be a plain hierarchical URL: {}",
                base_address
            )));
        }

        let required = clean_names(self.required)?;
        let optional = clean_names(self.optional)?;

        let overlap: Vec<&str> = required.intersection(&optional).map(String::as_str).collect();
        if !overlap.is_empty() {
            return Err(TwitchError::configuration(format!(
                "required and optional parameters must be disjoint, both declare: {}",
                overlap.join(", ")
            )));
        }

        let path_suffix = if path_suffix.starts_with('/') {
            path_suffix.to_string()
        } else {
            format!("/{}", path_suffix)
        };

        Ok(Endpoint {
            base,
            path_suffix,
            required,
            optional,
        })
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn clean_names(names: Vec<String>) -> TwitchResult<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(TwitchError::configuration("parameter names must not be empty"));
        }
        set.insert(name.to_string());
    }
    Ok(set)
}

impl Endpoint {
    /// Start building an endpoint for `base_address` + `path_suffix`.
    pub fn builder(base_address: impl Into<String>, path_suffix: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder {
            base_address: base_address.into(),
            path_suffix: path_suffix.into(),
            ..Default::default()
        }
    }

    pub fn base_address(&self) -> &str {
        self.base.as_str()
    }

    pub fn path_suffix(&self) -> &str {
        &self.path_suffix
    }

    pub fn required_params(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn optional_params(&self) -> &BTreeSet<String> {
        &self.optional
    }

    /// True if the endpoint declares `name` as required or optional.
    pub fn accepts(&self, name: &str) -> bool {
        self.required.contains(name) || self.optional.contains(name)
    }

    /// Required parameters that are absent or blank in `query`, sorted.
    pub fn missing_params(&self, query: &Query) -> Vec<String> {
        self.required
            .iter()
            .filter(|name| query.get(*name).map_or(true, |value| is_blank(value)))
            .cloned()
            .collect()
    }

    fn build_url(&self, route: &str, query: &Query, trailing_slash: TrailingSlash) -> TwitchResult<Url> {
        let missing = self.missing_params(query);
        if !missing.is_empty() {
            return Err(TwitchError::MissingParameters {
                route: route.to_string(),
                missing,
            });
        }

        let mut url = self.base.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), self.path_suffix);
        url.set_path(&trailing_slash.apply(&path));
        url.set_query(None);

        let params: Vec<(&String, &String)> = query
            .iter()
            .filter(|(name, value)| self.accepts(name) && !is_blank(value))
            .collect();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Mapping from logical route names to endpoints.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<String, Endpoint>,
    trailing_slash: TrailingSlash,
}

impl RouteRegistry {
    /// Create an empty registry with a fixed trailing slash policy.
    pub fn new(trailing_slash: TrailingSlash) -> Self {
        Self {
            routes: BTreeMap::new(),
            trailing_slash,
        }
    }

    /// Register an endpoint under `name`.
    pub fn register(&mut self, name: impl Into<String>, endpoint: Endpoint) -> TwitchResult<()> {
        let name = name.into();
        let key = name.trim();
        if key.is_empty() {
            return Err(TwitchError::configuration("route name must not be empty"));
        }
        if self.routes.contains_key(key) {
            return Err(TwitchError::configuration(format!(
                "route {} is already registered",
                key
            )));
        }
        self.routes.insert(key.to_string(), endpoint);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.routes.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Registered route names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn trailing_slash(&self) -> TrailingSlash {
        self.trailing_slash
    }

    /// Build the request URL for route `name`.
    pub fn build_url(&self, name: &str, query: &Query) -> TwitchResult<Url> {
        let endpoint = self
            .routes
            .get(name)
            .ok_or_else(|| TwitchError::UnknownRoute(name.to_string()))?;
        endpoint.build_url(name, query, self.trailing_slash)
    }
}
