pub mod author;
pub mod book;
pub mod book_authors;
pub mod book_tags;
pub mod edition;
pub mod tag;
pub mod user;

pub use book::Book;

use chrono::{SecondsFormat, Utc};

/// Current UTC time as a fixed-width RFC 3339 string.
///
/// Every timestamp column is written through this helper so that lexical
/// ordering of the stored text matches chronological ordering.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
