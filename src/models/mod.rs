mod recipe;
mod user;

pub use recipe::{Recipe, RecipeFields, RecipePatch};
pub use user::User;

use chrono::{DateTime, Utc};

/// Converts a stored epoch-millisecond column into a UTC timestamp.
///
/// Out-of-range values collapse to the Unix epoch.
pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
