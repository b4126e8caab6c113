use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The set of users currently backing one poll option.
///
/// Stored as a JSON object of `user_id -> true` so adding or removing a voter
/// never reshuffles the rest of the blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteLedger {
    voters: HashSet<String>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the user was not already present.
    pub fn add(&mut self, user_id: &str) -> bool {
        self.voters.insert(user_id.to_string())
    }

    /// Returns true if the user was present.
    pub fn remove(&mut self, user_id: &str) -> bool {
        self.voters.remove(user_id)
    }

    pub fn has(&self, user_id: &str) -> bool {
        self.voters.contains(user_id)
    }

    pub fn count(&self) -> usize {
        self.voters.len()
    }
}

impl Serialize for VoteLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.voters.len()))?;
        for voter in &self.voters {
            map.serialize_entry(voter, &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VoteLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `null` shows up for ledgers that were never written to.
        let markers = Option::<HashMap<String, bool>>::deserialize(deserializer)?.unwrap_or_default();
        let voters = markers
            .into_iter()
            .filter_map(|(user_id, present)| present.then_some(user_id))
            .collect();
        Ok(Self { voters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_and_count() {
        let mut ledger = VoteLedger::new();
        assert_eq!(ledger.count(), 0);
        assert!(ledger.add("alice"));
        assert!(!ledger.add("alice"));
        assert!(ledger.add("bob"));
        assert!(ledger.has("alice"));
        assert_eq!(ledger.count(), 2);

        assert!(ledger.remove("alice"));
        assert!(!ledger.remove("alice"));
        assert!(!ledger.has("alice"));
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn serializes_as_presence_map() {
        let mut ledger = VoteLedger::new();
        ledger.add("42");
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json, serde_json::json!({ "42": true }));
    }

    #[test]
    fn loads_presence_map_and_drops_false_markers() {
        let ledger: VoteLedger = serde_json::from_str(r#"{"1": true, "2": false, "3": true}"#).unwrap();
        assert!(ledger.has("1"));
        assert!(!ledger.has("2"));
        assert!(ledger.has("3"));
        assert_eq!(ledger.count(), 2);
    }

    #[test]
    fn loads_null_as_empty() {
        let ledgers: Vec<VoteLedger> = serde_json::from_str("[null, {}]").unwrap();
        assert!(ledgers.iter().all(|l| l.count() == 0));
    }
}
