//! Filter Engine
//!
//! Turns a `filterBy` parameter bag into a predicate over miss events.
//!
//! ```text
//! {"url": "wp-", "ip": "10.0.0.1"}
//!        ↓ FilterBy::from_value
//! FilterBy { url: Some("wp-"), ip: Some("10.0.0.1"), .. }
//!        ↓ FilterBy::predicate
//! url LIKE '%wp-%' AND ip = '10.0.0.1'
//! ```
//!
//! | key         | field        | match                     |
//! |-------------|--------------|---------------------------|
//! | `ip`        | `ip`         | exact                     |
//! | `url`       | `url`        | substring, ASCII-caseless |
//! | `url-exact` | `url`        | exact                     |
//! | `referrer`  | `referrer`   | substring, ASCII-caseless |
//! | `agent`     | `user_agent` | substring, ASCII-caseless |

mod error;
mod filter_by;
mod predicate;

pub use error::{FilterError, FilterResult};
pub use filter_by::{FilterBy, FilterKey};
pub use predicate::{Condition, Field, Predicate, SqlClause};
