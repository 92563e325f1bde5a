// Strong identity types shared across the document models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Strongly-typed user identity - assigned at account creation, immutable,
/// referenced (never embedded) by every other document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Generated ids are always positive
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_operations() {
        let id = UserId::new(123);
        assert_eq!(id.value(), 123);
        assert!(id.is_valid());
        assert!(!UserId::new(-1).is_valid());
        assert_eq!(id.to_string(), "123");
    }

    #[test]
    fn test_user_id_map_keys_serialize_as_strings() {
        let mut map = std::collections::HashMap::new();
        map.insert(UserId::new(7), "alice");
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["7"], "alice");
    }
}
