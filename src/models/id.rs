use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a record that may not have been persisted yet.
///
/// Clients assign a local id (any non-UUID string, e.g. `"local-1718log2"`)
/// to rows they created offline; the gateway replaces it with a server UUID
/// on insert and never attempts an update keyed by a pending id. Untagged
/// serde tries the UUID arm first, so the distinction is made at parse time
/// rather than by prefix sniffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Persisted(Uuid),
    Pending(String),
}

impl RecordId {
    pub fn persisted(&self) -> Option<Uuid> {
        match self {
            Self::Persisted(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self::Persisted(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_strings_parse_as_persisted() {
        let id: RecordId = serde_json::from_str("\"9f2c4e21-97ab-4f4e-8a30-0d5b8f6f2a11\"").unwrap();
        assert!(id.persisted().is_some());
    }

    #[test]
    fn non_uuid_strings_parse_as_pending() {
        let id: RecordId = serde_json::from_str("\"local-1718020800-3\"").unwrap();
        assert!(id.is_pending());
        assert_eq!(id.persisted(), None);
    }
}
