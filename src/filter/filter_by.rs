//! Declarative filter input
//!
//! `FilterBy` is the validated form of a `filterBy` parameter bag. Only the
//! five recognised keys survive parsing; unknown keys are dropped so older
//! servers keep working when clients add new ones.

use crate::filter::error::{FilterError, FilterResult};
use crate::filter::predicate::{Condition, Field, Predicate};
use serde_json::Value;

/// Recognised filter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Client address, exact match
    Ip,
    /// Requested URL, substring match
    Url,
    /// Requested URL, exact match
    UrlExact,
    /// Referrer, substring match
    Referrer,
    /// User agent, substring match
    Agent,
}

impl FilterKey {
    pub fn all() -> &'static [FilterKey] {
        &[
            FilterKey::Ip,
            FilterKey::Url,
            FilterKey::UrlExact,
            FilterKey::Referrer,
            FilterKey::Agent,
        ]
    }

    /// Parse a wire key. Returns None for keys this engine does not know.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ip" => Some(Self::Ip),
            "url" => Some(Self::Url),
            "url-exact" => Some(Self::UrlExact),
            "referrer" => Some(Self::Referrer),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    /// Wire name of this key
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Url => "url",
            Self::UrlExact => "url-exact",
            Self::Referrer => "referrer",
            Self::Agent => "agent",
        }
    }

    fn condition(&self, value: &str) -> Condition {
        let value = value.to_string();
        match self {
            Self::Ip => Condition::Exact { field: Field::Ip, value },
            Self::Url => Condition::Contains { field: Field::Url, value },
            Self::UrlExact => Condition::Exact { field: Field::Url, value },
            Self::Referrer => Condition::Contains { field: Field::Referrer, value },
            Self::Agent => Condition::Contains { field: Field::UserAgent, value },
        }
    }
}

impl std::fmt::Display for FilterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Validated filter criteria. Every present field must match (logical AND).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterBy {
    pub ip: Option<String>,
    pub url: Option<String>,
    pub url_exact: Option<String>,
    pub referrer: Option<String>,
    pub agent: Option<String>,
}

impl FilterBy {
    /// A filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set one criterion. Empty values clear it.
    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Set one criterion. Empty values clear it.
    pub fn set(&mut self, key: FilterKey, value: String) {
        let value = if value.is_empty() { None } else { Some(value) };
        *self.slot_mut(key) = value;
    }

    /// Current value of one criterion
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        match key {
            FilterKey::Ip => self.ip.as_deref(),
            FilterKey::Url => self.url.as_deref(),
            FilterKey::UrlExact => self.url_exact.as_deref(),
            FilterKey::Referrer => self.referrer.as_deref(),
            FilterKey::Agent => self.agent.as_deref(),
        }
    }

    fn slot_mut(&mut self, key: FilterKey) -> &mut Option<String> {
        match key {
            FilterKey::Ip => &mut self.ip,
            FilterKey::Url => &mut self.url,
            FilterKey::UrlExact => &mut self.url_exact,
            FilterKey::Referrer => &mut self.referrer,
            FilterKey::Agent => &mut self.agent,
        }
    }

    /// True when no criterion is set
    pub fn is_empty(&self) -> bool {
        FilterKey::all().iter().all(|key| self.get(*key).is_none())
    }

    /// Present criteria as (key, value) pairs, in a stable order
    pub fn entries(&self) -> Vec<(FilterKey, &str)> {
        FilterKey::all()
            .iter()
            .filter_map(|key| self.get(*key).map(|value| (*key, value)))
            .collect()
    }

    /// Read a `filterBy` mapping.
    ///
    /// Unknown keys are ignored. `null` and empty strings count as absent.
    /// Numbers and booleans are matched by their string form. Arrays and
    /// objects under a recognised key are rejected.
    pub fn from_value(value: &Value) -> FilterResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => {
                return Err(FilterError::invalid(
                    "filterBy",
                    "expected a mapping of filter keys to values",
                ))
            }
        };

        let mut filter = Self::default();

        for (name, raw) in map {
            let Some(key) = FilterKey::from_name(name) else {
                tracing::debug!(key = %name, "Ignoring unknown filter key");
                continue;
            };

            if let Some(scalar) = scalar_to_string(key.name(), raw)? {
                filter.set(key, scalar);
            }
        }

        Ok(filter)
    }

    /// Build the predicate for these criteria
    pub fn predicate(&self) -> Predicate {
        Predicate::new(
            self.entries()
                .into_iter()
                .map(|(key, value)| key.condition(value))
                .collect(),
        )
    }
}

fn scalar_to_string(field: &str, value: &Value) -> FilterResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) => Err(FilterError::invalid(field, "expected a scalar, got an array")),
        Value::Object(_) => Err(FilterError::invalid(field, "expected a scalar, got an object")),
    }
}
