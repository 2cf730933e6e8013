//! SourceBlock - work queue message payload
//!
//! Names one or more object-store keys to (re)process. `key` and `keys` are
//! mutually exclusive on the wire; both normalize to a non-empty ordered key
//! sequence before use.

use serde::{Deserialize, Serialize};

use crate::{BucketId, ContractError};

/// One queue message: "a new/changed object appeared in `bucket` at `key`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBlock {
    /// Source bucket identity
    pub bucket: BucketId,

    /// Single source key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Merged key range, in order (rare)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl SourceBlock {
    /// Single-key block
    pub fn new(bucket: impl Into<BucketId>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: Some(key.into()),
            keys: Vec::new(),
        }
    }

    /// Multi-key block over a merged key range
    pub fn with_keys(bucket: impl Into<BucketId>, keys: Vec<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: None,
            keys,
        }
    }

    /// Normalize `key`/`keys` into a non-empty ordered sequence.
    ///
    /// # Errors
    /// `BadBlock` when both or neither are set, or the sequence is empty.
    pub fn normalized_keys(&self) -> Result<Vec<String>, ContractError> {
        match (&self.key, self.keys.is_empty()) {
            (Some(_), false) => Err(ContractError::BadBlock {
                message: format!("both key and keys set for bucket '{}'", self.bucket),
            }),
            (Some(k), true) => Ok(vec![k.clone()]),
            (None, false) => Ok(self.keys.clone()),
            (None, true) => Err(ContractError::BadBlock {
                message: format!("neither key nor keys set for bucket '{}'", self.bucket),
            }),
        }
    }

    /// Canonical key for lineage and reconciliation: the lexicographic
    /// minimum of the normalized sequence.
    pub fn canonical_key(&self) -> Result<String, ContractError> {
        let keys = self.normalized_keys()?;
        Ok(keys.into_iter().min().unwrap_or_default())
    }
}
