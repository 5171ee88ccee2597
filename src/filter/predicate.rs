//! Predicates over miss events
//!
//! A `Predicate` is a conjunction of simple conditions. It renders two ways
//! that must agree:
//!
//! - `to_sql()`: a `WHERE` fragment with bound parameters, run by the store
//! - `matches()`: in-memory evaluation against a `MissEvent`
//!
//! Substring conditions use SQL `LIKE`, which folds ASCII case only. The
//! in-memory side folds the same way.

use crate::store::{GroupBy, MissEvent};

/// Event field a condition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Url,
    Ip,
    Referrer,
    UserAgent,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Referrer => "referrer",
            Self::UserAgent => "user_agent",
        }
    }

    fn value_of<'a>(&self, event: &'a MissEvent) -> Option<&'a str> {
        match self {
            Self::Url => Some(event.url.as_str()),
            Self::Ip => event.ip.as_deref(),
            Self::Referrer => event.referrer.as_deref(),
            Self::UserAgent => event.user_agent.as_deref(),
        }
    }
}

impl From<GroupBy> for Field {
    fn from(group_by: GroupBy) -> Self {
        match group_by {
            GroupBy::Ip => Field::Ip,
            GroupBy::Url => Field::Url,
        }
    }
}

/// A single test against one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Field equals value (case-sensitive)
    Exact { field: Field, value: String },
    /// Field contains value (ASCII case-insensitive)
    Contains { field: Field, value: String },
    /// Field is NULL or empty
    Blank { field: Field },
}

impl Condition {
    /// Check a single event
    pub fn matches(&self, event: &MissEvent) -> bool {
        match self {
            Self::Exact { field, value } => field.value_of(event) == Some(value.as_str()),
            Self::Contains { field, value } => field
                .value_of(event)
                .map(|haystack| {
                    haystack
                        .to_ascii_lowercase()
                        .contains(&value.to_ascii_lowercase())
                })
                .unwrap_or(false),
            Self::Blank { field } => field.value_of(event).map_or(true, str::is_empty),
        }
    }

    fn push_sql(&self, clauses: &mut Vec<String>, params: &mut Vec<String>) {
        match self {
            Self::Exact { field, value } => {
                clauses.push(format!("{} = ?", field.column()));
                params.push(value.clone());
            }
            Self::Contains { field, value } => {
                clauses.push(format!("{} LIKE ? ESCAPE '\\'", field.column()));
                params.push(format!("%{}%", escape_like(value)));
            }
            Self::Blank { field } => {
                let column = field.column();
                clauses.push(format!("({column} IS NULL OR {column} = '')"));
            }
        }
    }
}

/// Escape LIKE wildcards so user input only ever matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQL rendering of a predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlClause {
    /// Either empty or ` WHERE ...` with a leading space
    pub where_sql: String,
    /// Positional parameters for the `?` placeholders
    pub params: Vec<String>,
}

/// Conjunction of conditions. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Predicate that matches every event
    pub fn always() -> Self {
        Self::default()
    }

    /// Events whose group dimension equals `value`.
    ///
    /// The empty key selects the bucket of missing values, the same bucket
    /// grouped views report as `""`.
    pub fn group(dimension: GroupBy, value: &str) -> Self {
        let field = Field::from(dimension);
        let condition = if value.is_empty() {
            Condition::Blank { field }
        } else {
            Condition::Exact {
                field,
                value: value.to_string(),
            }
        };
        Self::new(vec![condition])
    }

    pub fn is_always(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate against one event
    pub fn matches(&self, event: &MissEvent) -> bool {
        self.conditions.iter().all(|c| c.matches(event))
    }

    /// Render as a `WHERE` fragment
    pub fn to_sql(&self) -> SqlClause {
        if self.conditions.is_empty() {
            return SqlClause::default();
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();
        for condition in &self.conditions {
            condition.push_sql(&mut clauses, &mut params);
        }

        SqlClause {
            where_sql: format!(" WHERE {}", clauses.join(" AND ")),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(url: &str, ip: Option<&str>, agent: Option<&str>) -> MissEvent {
        MissEvent {
            id: 1,
            url: url.to_string(),
            referrer: None,
            user_agent: agent.map(str::to_string),
            ip: ip.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_always_matches_and_renders_empty() {
        let predicate = Predicate::always();
        assert!(predicate.matches(&event("/a", None, None)));
        assert_eq!(predicate.to_sql(), SqlClause::default());
    }

    #[test]
    fn test_exact_excludes_substring() {
        let predicate = Predicate::new(vec![Condition::Exact {
            field: Field::Url,
            value: "/missing".to_string(),
        }]);

        assert!(predicate.matches(&event("/missing", None, None)));
        assert!(!predicate.matches(&event("/missing/page", None, None)));
        assert!(!predicate.matches(&event("/old/missing", None, None)));
    }

    #[test]
    fn test_contains_folds_ascii_case() {
        let predicate = Predicate::new(vec![Condition::Contains {
            field: Field::UserAgent,
            value: "Bot".to_string(),
        }]);

        assert!(predicate.matches(&event("/", None, Some("Googlebot/2.1"))));
        assert!(!predicate.matches(&event("/", None, Some("Mozilla/5.0"))));
        assert!(!predicate.matches(&event("/", None, None)));
    }

    #[test]
    fn test_conditions_are_anded() {
        let predicate = Predicate::new(vec![
            Condition::Contains {
                field: Field::Url,
                value: "wp-".to_string(),
            },
            Condition::Exact {
                field: Field::Ip,
                value: "10.0.0.1".to_string(),
            },
        ]);

        assert!(predicate.matches(&event("/wp-login.php", Some("10.0.0.1"), None)));
        assert!(!predicate.matches(&event("/wp-login.php", Some("10.0.0.2"), None)));
        assert!(!predicate.matches(&event("/login.php", Some("10.0.0.1"), None)));
    }

    #[test]
    fn test_sql_rendering() {
        let predicate = Predicate::new(vec![
            Condition::Exact {
                field: Field::Ip,
                value: "10.0.0.1".to_string(),
            },
            Condition::Contains {
                field: Field::Referrer,
                value: "50%_off".to_string(),
            },
        ]);

        let sql = predicate.to_sql();
        assert_eq!(
            sql.where_sql,
            " WHERE ip = ? AND referrer LIKE ? ESCAPE '\\'"
        );
        assert_eq!(sql.params, vec!["10.0.0.1", "%50\\%\\_off%"]);
    }

    #[test]
    fn test_group_with_empty_key_selects_blank_bucket() {
        let predicate = Predicate::group(GroupBy::Ip, "");

        assert!(predicate.matches(&event("/", None, None)));
        assert!(predicate.matches(&event("/", Some(""), None)));
        assert!(!predicate.matches(&event("/", Some("1.2.3.4"), None)));
        assert_eq!(predicate.to_sql().where_sql, " WHERE (ip IS NULL OR ip = '')");
        assert!(predicate.to_sql().params.is_empty());
    }

    #[test]
    fn test_group_by_url_is_exact() {
        let predicate = Predicate::group(GroupBy::Url, "foo.html");
        assert!(predicate.matches(&event("foo.html", None, None)));
        assert!(!predicate.matches(&event("/foo.html", None, None)));
    }
}
