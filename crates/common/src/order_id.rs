use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix carried by every generated order identifier.
pub const ORDER_ID_PREFIX: &str = "ORD-";

/// Unique identifier for an order.
///
/// Generated identifiers look like `ORD-<unix nanos>-<8 hex chars>`. The
/// timestamp keeps them roughly sortable by creation time; the random suffix
/// keeps two identifiers minted in the same nanosecond distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generates a new time-derived order ID.
    pub fn generate() -> Self {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{ORDER_ID_PREFIX}{nanos}-{}", &suffix[..8]))
    }

    /// Wraps an existing identifier string without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        let id = OrderId::generate();
        assert!(id.as_str().starts_with(ORDER_ID_PREFIX));
    }

    #[test]
    fn generated_ids_are_unique_in_a_tight_loop() {
        let ids: HashSet<OrderId> = (0..10_000).map(|_| OrderId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn generated_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| OrderId::generate()).collect::<Vec<_>>()))
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 4_000);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = OrderId::new("ORD-1-abcdef01");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ORD-1-abcdef01\"");

        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
