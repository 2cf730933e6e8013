//! Lineage - recursive provenance record (`etl` field)
//!
//! Every produced artifact carries a lineage chain back to the originating
//! source key. The chain both determines the artifact's destination key
//! (ancestry ids joined with `.`) and is what the date-partitioned index is
//! queried by when reconciliation asks for previously produced keys.

use serde::{Deserialize, Serialize};

/// Provenance chain for one artifact.
///
/// Serializes to the `etl` JSON shape: `{"id": ...}` at the root,
/// `{"id": ..., "name": ..., "type": ..., "source": {...}}` per derived
/// stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lineage {
    /// One derived stage on top of its source chain
    Derived {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        source: Box<Lineage>,
    },
    /// The originating source key
    Root { id: String },
}

impl Lineage {
    /// Root of a new chain
    pub fn root(id: impl Into<String>) -> Self {
        Self::Root { id: id.into() }
    }

    /// Append one derived stage to this chain.
    pub fn derive(
        &self,
        id: impl Into<String>,
        name: Option<&str>,
        kind: Option<&str>,
    ) -> Self {
        Self::Derived {
            id: id.into(),
            name: name.map(str::to_string),
            kind: kind.map(str::to_string),
            source: Box::new(self.clone()),
        }
    }

    /// Id of the most derived stage.
    pub fn leaf_id(&self) -> &str {
        match self {
            Self::Root { id } => id,
            Self::Derived { id, .. } => id,
        }
    }

    /// Stage ids from root to leaf.
    pub fn ancestry(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cursor = self;
        loop {
            match cursor {
                Self::Root { id } => {
                    path.push(id.as_str());
                    break;
                }
                Self::Derived { id, source, .. } => {
                    path.push(id.as_str());
                    cursor = source;
                }
            }
        }
        path.reverse();
        path
    }

    /// Destination key for this chain: ancestry ids joined with `.`.
    pub fn key(&self) -> String {
        self.ancestry().join(".")
    }

    /// Inverse of [`Lineage::key`]: rebuild a chain from a dotted key.
    ///
    /// Names and kinds are not recoverable from a key and are left unset.
    pub fn parse(key: &str) -> Self {
        let mut segments = key.split('.');
        // split always yields at least one segment
        let mut lineage = Self::root(segments.next().unwrap_or_default());
        for segment in segments {
            lineage = lineage.derive(segment, None, None);
        }
        lineage
    }

    /// Number of stages in the chain.
    pub fn depth(&self) -> usize {
        match self {
            Self::Root { .. } => 1,
            Self::Derived { source, .. } => 1 + source.depth(),
        }
    }
}

/// Ancestry query against an index: matches documents whose lineage chain
/// strictly extends the query's root-first ancestry.
///
/// A production search-cluster adapter compiles this to one term filter per
/// `etl(.source)*.id` depth; the in-memory cluster evaluates it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageQuery {
    /// Root-first stage ids the matching chain must start with
    pub ancestry: Vec<String>,
}

impl LineageQuery {
    /// Query for all artifacts derived from `key`.
    pub fn for_key(key: &str) -> Self {
        Self {
            ancestry: Lineage::parse(key)
                .ancestry()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Whether `lineage` is a strict descendant of this ancestry.
    pub fn matches(&self, lineage: &Lineage) -> bool {
        let path = lineage.ancestry();
        path.len() > self.ancestry.len()
            && path
                .iter()
                .zip(self.ancestry.iter())
                .all(|(a, b)| *a == b.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_round_trip() {
        let key = "2020-01-01.abc123.5.000";
        let lineage = Lineage::parse(key);
        assert_eq!(lineage.key(), key);
        assert_eq!(lineage.depth(), 4);
        assert_eq!(lineage.ancestry(), vec!["2020-01-01", "abc123", "5", "000"]);
        assert_eq!(lineage.leaf_id(), "000");
    }

    #[test]
    fn test_derive_extends_key() {
        let lineage = Lineage::parse("140847.5").derive(
            "0",
            Some("pulse block to unittest logs"),
            Some("join"),
        );
        assert_eq!(lineage.key(), "140847.5.0");
        assert_eq!(lineage.leaf_id(), "0");
    }

    #[test]
    fn test_serde_shape() {
        let lineage = Lineage::root("140847").derive("5", Some("split"), Some("join"));
        let json = serde_json::to_value(&lineage).unwrap();
        assert_eq!(json["id"], "5");
        assert_eq!(json["name"], "split");
        assert_eq!(json["type"], "join");
        assert_eq!(json["source"]["id"], "140847");

        let back: Lineage = serde_json::from_value(json).unwrap();
        assert_eq!(back, lineage);
    }

    #[test]
    fn test_query_matches_strict_descendants_only() {
        let query = LineageQuery::for_key("140847.5");

        let child = Lineage::parse("140847.5.0");
        let grandchild = Lineage::parse("140847.5.0.2");
        let itself = Lineage::parse("140847.5");
        let sibling = Lineage::parse("140847.6.0");

        assert!(query.matches(&child));
        assert!(query.matches(&grandchild));
        assert!(!query.matches(&itself));
        assert!(!query.matches(&sibling));
    }

    #[test]
    fn test_query_is_segment_wise_not_string_prefix() {
        // "140847.50" must not match a query for "140847.5"
        let query = LineageQuery::for_key("140847.5");
        assert!(!query.matches(&Lineage::parse("140847.50.1")));
    }
}
