//! List results

use crate::store::{GroupSummary, MissEvent};
use serde::Serialize;

/// Rows of a list page: events in flat mode, group counts in grouped mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListItems {
    Events(Vec<MissEvent>),
    Groups(Vec<GroupSummary>),
}

impl ListItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Events(events) => events.len(),
            Self::Groups(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of a list plus the size of the whole matching set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResult {
    pub items: ListItems,
    /// Matching events in flat mode, distinct groups in grouped mode
    pub total: u64,
}

impl ListResult {
    /// Events on this page, if the result is flat
    pub fn events(&self) -> Option<&[MissEvent]> {
        match &self.items {
            ListItems::Events(events) => Some(events),
            ListItems::Groups(_) => None,
        }
    }

    /// Groups on this page, if the result is grouped
    pub fn groups(&self) -> Option<&[GroupSummary]> {
        match &self.items {
            ListItems::Groups(groups) => Some(groups),
            ListItems::Events(_) => None,
        }
    }
}
