//! Record identity assignment.
//!
//! # Responsibility
//! - Produce process-unique identifiers for client-assigned records.
//! - Name the active identity strategy (client vs. backend assigned).
//!
//! # Invariants
//! - Under `IdStrategy::Server` the engine never calls an assigner; the id
//!   returned by the store is authoritative.

use crate::model::intervention::InterventionId;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Which side assigns record identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// The engine assigns a UUID before the optimistic insert.
    #[default]
    Client,
    /// The backing store assigns the id when persisting.
    Server,
}

impl IdStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Self::Client),
            "server" => Some(Self::Server),
            _ => None,
        }
    }
}

impl Display for IdStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of new record identifiers.
pub trait IdentityAssigner {
    /// Returns an identifier never returned before in this process.
    fn next(&self) -> InterventionId;
}

/// Random v4 UUID assigner, formatted as lowercase hyphenated text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidAssigner;

impl IdentityAssigner for UuidAssigner {
    fn next(&self) -> InterventionId {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{IdStrategy, IdentityAssigner, UuidAssigner};
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn uuid_assigner_yields_distinct_canonical_ids() {
        let assigner = UuidAssigner;
        let ids = (0..1_000).map(|_| assigner.next()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000);
        for id in &ids {
            let parsed = Uuid::parse_str(id).expect("assigned id should be a uuid");
            assert_eq!(parsed.to_string(), *id);
        }
    }

    #[test]
    fn id_strategy_parses_case_insensitively() {
        assert_eq!(IdStrategy::parse(" Server "), Some(IdStrategy::Server));
        assert_eq!(IdStrategy::parse("client"), Some(IdStrategy::Client));
        assert_eq!(IdStrategy::parse("backend"), None);
        assert_eq!(IdStrategy::default(), IdStrategy::Client);
    }
}
