use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user as exposed over the API.
///
/// The password hash lives only in the store and is never part of this type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
