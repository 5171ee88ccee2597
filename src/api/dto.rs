//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! List and delete requests arrive as loose parameter bags and are read
//! into `ListParams`; only the response shapes are fixed here.

use crate::query::{ListItems, ListResult, Page};
use crate::store::{GroupBy, MissEvent};
use serde::Serialize;

// ============================================
// LIST DTOs
// ============================================

/// One page of the miss log, flat or grouped
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Events in flat mode, `{group_key, count}` rows in grouped mode
    pub items: ListItems,
    /// Size of the whole matching set
    pub total: u64,
    /// 1-based page number that was served
    pub page: u32,
    /// Page size that was applied
    pub per_page: u32,
    /// Grouping dimension, absent in flat mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
}

impl ListResponse {
    pub fn new(result: ListResult, page: Page, group_by: Option<GroupBy>) -> Self {
        Self {
            items: result.items,
            total: result.total,
            page: page.page,
            per_page: page.per_page,
            group_by,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Store status
    pub storage: String,
    /// Stored events, when the store answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<u64>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

// ============================================
// EXPORT DTOs
// ============================================

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// One CSV row. Missing optional fields become empty cells.
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    pub id: i64,
    pub url: &'a str,
    pub referrer: &'a str,
    pub user_agent: &'a str,
    pub ip: &'a str,
    pub created_at: String,
}

impl<'a> From<&'a MissEvent> for ExportRow<'a> {
    fn from(event: &'a MissEvent) -> Self {
        Self {
            id: event.id,
            url: &event.url,
            referrer: event.referrer.as_deref().unwrap_or(""),
            user_agent: event.user_agent.as_deref().unwrap_or(""),
            ip: event.ip.as_deref().unwrap_or(""),
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GroupSummary;

    #[test]
    fn test_list_response_shape() {
        let result = ListResult {
            items: ListItems::Groups(vec![GroupSummary {
                group_key: "10.0.0.1".to_string(),
                count: 4,
            }]),
            total: 1,
        };
        let page = Page {
            per_page: 25,
            page: 1,
        };

        let json =
            serde_json::to_value(ListResponse::new(result, page, Some(GroupBy::Ip))).unwrap();
        assert_eq!(json["group_by"], "ip");
        assert_eq!(json["per_page"], 25);
        assert_eq!(json["items"][0]["count"], 4);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xml"), None);
    }
}
