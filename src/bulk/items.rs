//! Item tokens for bulk deletes
//!
//! A bulk delete names its targets with tokens that are either a record id
//! or a group value. Which one a token is gets decided in exactly one place,
//! `parse_item_token`.

use crate::bulk::error::{BulkError, BulkResult};
use serde_json::Value;

/// One target of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemToken {
    /// A single event
    Id(i64),
    /// Every event whose group dimension equals this value
    Group(String),
}

/// Classify a token.
///
/// A token is an id when, after trimming whitespace, it is a non-empty run
/// of ASCII digits that fits in `i64`. Anything else is a group value and is
/// kept verbatim.
pub fn parse_item_token(token: &str) -> ItemToken {
    let trimmed = token.trim();

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = trimmed.parse::<i64>() {
            return ItemToken::Id(id);
        }
    }

    ItemToken::Group(token.to_string())
}

/// Read an `items` argument.
///
/// Accepts a JSON array of scalars, or a comma-separated string. In the
/// string form empty segments are skipped; in the array form an empty
/// string is kept and targets the blank group.
pub fn parse_items(value: &Value) -> BulkResult<Vec<ItemToken>> {
    match value {
        Value::Array(values) => values
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(s) => Ok(parse_item_token(s)),
                Value::Number(n) => Ok(parse_item_token(&n.to_string())),
                Value::Bool(b) => Ok(ItemToken::Group(b.to_string())),
                Value::Null | Value::Array(_) | Value::Object(_) => Err(
                    BulkError::InvalidItemList(format!("item {} is not a scalar token", index)),
                ),
            })
            .collect(),
        Value::String(s) => Ok(split_items(s)),
        Value::Number(n) => Ok(vec![parse_item_token(&n.to_string())]),
        _ => Err(BulkError::InvalidItemList(
            "expected an array of ids or group values".to_string(),
        )),
    }
}

/// Read an `items` argument where every entry names a group, even entries
/// that look like ids. Only the array form is accepted.
pub fn parse_group_values(value: &Value) -> BulkResult<Vec<String>> {
    match value {
        Value::Array(values) => values
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    Err(BulkError::InvalidItemList(format!(
                        "item {} is not a scalar group value",
                        index
                    )))
                }
            })
            .collect(),
        _ => Err(BulkError::InvalidItemList(
            "expected an array of group values".to_string(),
        )),
    }
}

/// Split a comma-separated item list
pub fn split_items(s: &str) -> Vec<ItemToken> {
    s.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_item_token)
        .collect()
}
