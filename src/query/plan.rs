//! Query planning
//!
//! Resolves `ListParams` into a `Plan`: the predicate, the effective sort,
//! and the page window. Sorting always ends in a unique key so repeated
//! calls with no intervening writes return the same order:
//!
//! - flat mode: `<column> <dir>, id ASC`
//! - grouped mode: `<key> <dir>, group_key ASC`

use crate::filter::Predicate;
use crate::query::params::{Direction, ListParams, OrderBy};
use crate::store::GroupBy;

/// Default page size
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Largest page a single call may return
pub const MAX_PER_PAGE: u32 = 200;

/// Effective sort column in flat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatSort {
    CreatedAt,
    Url,
    Ip,
    Id,
}

impl FlatSort {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Id => "id",
        }
    }

    fn resolve(order_by: Option<OrderBy>) -> Self {
        match order_by {
            Some(OrderBy::Url) => Self::Url,
            Some(OrderBy::Ip) => Self::Ip,
            Some(OrderBy::Id) => Self::Id,
            _ => Self::CreatedAt,
        }
    }
}

/// Effective sort key in grouped mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSort {
    Count,
    GroupKey,
}

impl GroupSort {
    fn resolve(order_by: Option<OrderBy>) -> Self {
        match order_by {
            Some(OrderBy::Url) | Some(OrderBy::Ip) | Some(OrderBy::GroupKey) => Self::GroupKey,
            _ => Self::Count,
        }
    }
}

/// Page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows per page, at least 1
    pub per_page: u32,
    /// 1-based page number
    pub page: u32,
}

impl Page {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        (u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)) as i64
    }
}

/// A resolved retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Flat {
        predicate: Predicate,
        sort: FlatSort,
        direction: Direction,
        page: Page,
    },
    Grouped {
        predicate: Predicate,
        group_by: GroupBy,
        sort: GroupSort,
        direction: Direction,
        page: Page,
    },
}

impl Plan {
    pub fn predicate(&self) -> &Predicate {
        match self {
            Plan::Flat { predicate, .. } | Plan::Grouped { predicate, .. } => predicate,
        }
    }

    pub fn page(&self) -> Page {
        match self {
            Plan::Flat { page, .. } | Plan::Grouped { page, .. } => *page,
        }
    }

    /// `ORDER BY` clause, with the tie-break appended
    pub fn order_sql(&self) -> String {
        match self {
            Plan::Flat {
                sort: FlatSort::Id,
                direction,
                ..
            } => format!("ORDER BY id {}", direction.as_sql()),
            Plan::Flat {
                sort, direction, ..
            } => format!("ORDER BY {} {}, id ASC", sort.column(), direction.as_sql()),
            Plan::Grouped {
                sort: GroupSort::Count,
                direction,
                ..
            } => format!("ORDER BY total {}, group_key ASC", direction.as_sql()),
            Plan::Grouped {
                sort: GroupSort::GroupKey,
                direction,
                ..
            } => format!("ORDER BY group_key {}", direction.as_sql()),
        }
    }
}

/// Builds plans with bounded page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPlanner {
    default_per_page: u32,
    max_per_page: u32,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

impl QueryPlanner {
    /// Create a planner. `max_per_page` is at least 1 and the default page
    /// size never exceeds it.
    pub fn new(default_per_page: u32, max_per_page: u32) -> Self {
        let max_per_page = max_per_page.max(1);
        Self {
            default_per_page: default_per_page.clamp(1, max_per_page),
            max_per_page,
        }
    }

    pub fn max_per_page(&self) -> u32 {
        self.max_per_page
    }

    pub fn default_per_page(&self) -> u32 {
        self.default_per_page
    }

    /// Resolve parameters into a plan
    pub fn plan(&self, params: &ListParams) -> Plan {
        let predicate = params.filter.predicate();
        let direction = params.direction.unwrap_or(Direction::Desc);
        let page = self.page(params);

        let plan = match params.group_by {
            Some(group_by) => Plan::Grouped {
                predicate,
                group_by,
                sort: GroupSort::resolve(params.order_by),
                direction,
                page,
            },
            None => Plan::Flat {
                predicate,
                sort: FlatSort::resolve(params.order_by),
                direction,
                page,
            },
        };

        tracing::debug!(?plan, "Planned list query");
        plan
    }

    fn page(&self, params: &ListParams) -> Page {
        Page {
            per_page: params
                .per_page
                .unwrap_or(self.default_per_page)
                .clamp(1, self.max_per_page),
            page: params.page.unwrap_or(1).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterBy, FilterKey};

    #[test]
    fn test_defaults() {
        let plan = QueryPlanner::default().plan(&ListParams::new());

        match &plan {
            Plan::Flat {
                predicate,
                sort,
                direction,
                page,
            } => {
                assert!(predicate.is_always());
                assert_eq!(*sort, FlatSort::CreatedAt);
                assert_eq!(*direction, Direction::Desc);
                assert_eq!(page.per_page, DEFAULT_PER_PAGE);
                assert_eq!(page.page, 1);
            }
            Plan::Grouped { .. } => panic!("expected flat plan"),
        }
        assert_eq!(plan.order_sql(), "ORDER BY created_at DESC, id ASC");
    }

    #[test]
    fn test_per_page_is_capped() {
        let planner = QueryPlanner::default();
        let plan = planner.plan(&ListParams::new().per_page(10_000));
        assert_eq!(plan.page().per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_total_means_created_at_in_flat_mode() {
        let plan = QueryPlanner::default().plan(&ListParams::new().order_by(OrderBy::Total));
        assert!(matches!(
            plan,
            Plan::Flat {
                sort: FlatSort::CreatedAt,
                ..
            }
        ));
    }

    #[test]
    fn test_grouped_defaults_to_count() {
        let plan = QueryPlanner::default().plan(&ListParams::new().group_by(GroupBy::Ip));
        assert!(matches!(
            plan,
            Plan::Grouped {
                group_by: GroupBy::Ip,
                sort: GroupSort::Count,
                direction: Direction::Desc,
                ..
            }
        ));
        assert_eq!(plan.order_sql(), "ORDER BY total DESC, group_key ASC");
    }

    #[test]
    fn test_grouped_by_key() {
        let plan = QueryPlanner::default().plan(
            &ListParams::new()
                .group_by(GroupBy::Url)
                .order_by(OrderBy::Url)
                .direction(Direction::Asc),
        );
        assert_eq!(plan.order_sql(), "ORDER BY group_key ASC");
    }

    #[test]
    fn test_flat_sort_by_ip_ties_on_id() {
        let plan = QueryPlanner::default().plan(
            &ListParams::new()
                .order_by(OrderBy::Ip)
                .direction(Direction::Asc),
        );
        assert_eq!(plan.order_sql(), "ORDER BY ip ASC, id ASC");
    }

    #[test]
    fn test_page_offset() {
        let plan = QueryPlanner::default().plan(&ListParams::new().per_page(10).page(3));
        assert_eq!(plan.page().limit(), 10);
        assert_eq!(plan.page().offset(), 20);
    }

    #[test]
    fn test_planner_sanitises_limits() {
        let planner = QueryPlanner::new(500, 0);
        assert_eq!(planner.max_per_page(), 1);
        assert_eq!(planner.default_per_page(), 1);

        let planner = QueryPlanner::new(0, 50);
        assert_eq!(planner.default_per_page(), 1);
    }

    #[test]
    fn test_filter_carried_into_predicate() {
        let params = ListParams::new().filter(
            FilterBy::new()
                .with(FilterKey::Ip, "10.0.0.1")
                .with(FilterKey::Url, "wp-"),
        );
        let plan = QueryPlanner::default().plan(&params);
        assert_eq!(plan.predicate().len(), 2);
    }
}
