//! List parameters
//!
//! `ListParams` is the validated form of the loosely typed request bag
//! (`groupBy`, `orderby`, `direction`, `per_page`, `page`, `filterBy`).
//! Parsing never fails on unknown keys or unrecognised values; those fall
//! back to defaults. The only hard failure is a malformed filter value.

use crate::filter::{FilterBy, FilterError, FilterResult};
use crate::store::GroupBy;
use serde_json::{Map, Value};

/// Requested sort key, before it is resolved against the retrieval mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Url,
    Ip,
    CreatedAt,
    Id,
    /// Count in grouped mode, creation time in flat mode
    Total,
    GroupKey,
}

impl OrderBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "url" => Some(Self::Url),
            "ip" => Some(Self::Ip),
            "created_at" | "date" => Some(Self::CreatedAt),
            "id" => Some(Self::Id),
            "total" | "count" => Some(Self::Total),
            "group_key" => Some(Self::GroupKey),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Ip => "ip",
            Self::CreatedAt => "created_at",
            Self::Id => "id",
            Self::Total => "total",
            Self::GroupKey => "group_key",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Validated list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Active filter criteria
    pub filter: FilterBy,
    /// Grouping dimension; None selects flat mode
    pub group_by: Option<GroupBy>,
    /// Requested sort key; None uses the mode's default
    pub order_by: Option<OrderBy>,
    /// Requested direction; None means descending
    pub direction: Option<Direction>,
    /// Requested page size; clamped by the planner
    pub per_page: Option<u32>,
    /// Requested 1-based page
    pub page: Option<u32>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set filter
    pub fn filter(mut self, filter: FilterBy) -> Self {
        self.filter = filter;
        self
    }

    /// Builder method: switch to grouped mode
    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    /// Builder method: set sort key
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Builder method: set direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Builder method: set page size
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Builder method: set page
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Same request, starting again from page 1
    pub fn first_page(mut self) -> Self {
        self.page = None;
        self
    }

    /// Same request with the filter dropped
    pub fn without_filter(mut self) -> Self {
        self.filter = FilterBy::default();
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_by.is_some()
    }

    /// Read a JSON parameter bag.
    ///
    /// Anything that is not an object is treated as an empty bag.
    pub fn from_value(value: &Value) -> FilterResult<Self> {
        let Some(map) = value.as_object() else {
            return Ok(Self::default());
        };

        let filter = match map.get("filterBy") {
            Some(filter) => FilterBy::from_value(filter)?,
            None => FilterBy::default(),
        };

        Ok(Self {
            filter,
            group_by: map.get("groupBy").and_then(Value::as_str).and_then(GroupBy::parse),
            order_by: map.get("orderby").and_then(Value::as_str).and_then(OrderBy::parse),
            direction: map
                .get("direction")
                .and_then(Value::as_str)
                .and_then(Direction::parse),
            per_page: map.get("per_page").and_then(positive_int),
            page: map.get("page").and_then(positive_int),
        })
    }

    /// Read URL query pairs, where the filter arrives as `filterBy[key]=value`.
    ///
    /// `filterBy[key][]=value` is array notation and is rejected for
    /// recognised keys, the same way a JSON array would be.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> FilterResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut top = Map::new();
        let mut filter = Map::new();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value: String = value.into();

            let Some(inner) = key
                .strip_prefix("filterBy[")
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                top.insert(key.to_string(), Value::String(value));
                continue;
            };

            match inner.split_once("][") {
                Some((name, _)) => {
                    let entry = filter
                        .entry(name.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(values) = entry {
                        values.push(Value::String(value));
                    } else {
                        return Err(FilterError::invalid(name, "mixes scalar and array values"));
                    }
                }
                None => {
                    filter.insert(inner.to_string(), Value::String(value));
                }
            }
        }

        if !filter.is_empty() {
            top.insert("filterBy".to_string(), Value::Object(filter));
        }

        Self::from_value(&Value::Object(top))
    }

    /// Render back to URL query pairs, the inverse of `from_query_pairs`
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(group_by) = self.group_by {
            pairs.push(("groupBy".to_string(), group_by.to_string()));
        }
        if let Some(order_by) = self.order_by {
            pairs.push(("orderby".to_string(), order_by.name().to_string()));
        }
        if let Some(direction) = self.direction {
            pairs.push(("direction".to_string(), direction.name().to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        for (key, value) in self.filter.entries() {
            pairs.push((format!("filterBy[{}]", key), value.to_string()));
        }

        pairs
    }
}

/// Positive integer from a JSON number or numeric string
fn positive_int(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };

    if n == 0 {
        return None;
    }

    Some(u32::try_from(n).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKey;
    use serde_json::json;

    #[test]
    fn test_from_value_full() {
        let params = ListParams::from_value(&json!({
            "groupBy": "ip",
            "orderby": "total",
            "direction": "asc",
            "per_page": "50",
            "page": 3,
            "filterBy": {"url": "wp-"},
        }))
        .unwrap();

        assert_eq!(params.group_by, Some(GroupBy::Ip));
        assert_eq!(params.order_by, Some(OrderBy::Total));
        assert_eq!(params.direction, Some(Direction::Asc));
        assert_eq!(params.per_page, Some(50));
        assert_eq!(params.page, Some(3));
        assert_eq!(params.filter.url.as_deref(), Some("wp-"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let params = ListParams::from_value(&json!({
            "groupBy": "agent",
            "orderby": "DROP TABLE",
            "direction": "sideways",
            "per_page": -5,
            "page": "zero",
            "unknown": true,
        }))
        .unwrap();

        assert_eq!(params, ListParams::default());
    }

    #[test]
    fn test_zero_page_is_default() {
        let params = ListParams::from_value(&json!({"page": 0, "per_page": "0"})).unwrap();
        assert_eq!(params.page, None);
        assert_eq!(params.per_page, None);
    }

    #[test]
    fn test_direction_is_case_insensitive() {
        assert_eq!(Direction::parse("DESC"), Some(Direction::Desc));
        assert_eq!(Direction::parse("Asc"), Some(Direction::Asc));
    }

    #[test]
    fn test_malformed_filter_propagates() {
        let err = ListParams::from_value(&json!({"filterBy": {"ip": ["1", "2"]}})).unwrap_err();
        assert_eq!(err.field(), "ip");
    }

    #[test]
    fn test_from_query_pairs() {
        let params = ListParams::from_query_pairs(vec![
            ("groupBy", "url"),
            ("per_page", "10"),
            ("filterBy[url-exact]", "/missing"),
            ("filterBy[colour]", "red"),
        ])
        .unwrap();

        assert_eq!(params.group_by, Some(GroupBy::Url));
        assert_eq!(params.per_page, Some(10));
        assert_eq!(params.filter.url_exact.as_deref(), Some("/missing"));
        assert_eq!(params.filter.entries().len(), 1);
    }

    #[test]
    fn test_query_pairs_array_notation_rejected() {
        let err = ListParams::from_query_pairs(vec![
            ("filterBy[ip][]", "1.1.1.1"),
            ("filterBy[ip][]", "2.2.2.2"),
        ])
        .unwrap_err();
        assert_eq!(err.field(), "ip");
    }

    #[test]
    fn test_query_pairs_round_trip() {
        let params = ListParams::new()
            .group_by(GroupBy::Ip)
            .order_by(OrderBy::Total)
            .direction(Direction::Asc)
            .per_page(5)
            .page(2)
            .filter(FilterBy::new().with(FilterKey::Agent, "bot"));

        let parsed = ListParams::from_query_pairs(params.to_query_pairs()).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_first_page_and_without_filter() {
        let params = ListParams::new()
            .page(4)
            .filter(FilterBy::new().with(FilterKey::Ip, "1.1.1.1"))
            .first_page()
            .without_filter();

        assert_eq!(params.page, None);
        assert!(params.filter.is_empty());
    }
}
