//! Document - one record headed for a search index

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ContractError, Lineage};

/// One index document. `id` is the produced key and always equals
/// `etl.key()`; `value` is the transform output, opaque to the engine apart
/// from the timestamp fields used for day routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub etl: Lineage,
    pub value: Value,
}

impl Document {
    /// Build a document from its lineage; the id is derived, not supplied.
    pub fn new(etl: Lineage, value: Value) -> Self {
        Self {
            id: etl.key(),
            etl,
            value,
        }
    }

    /// Numeric field looked up by dotted path (`build.date`), epoch seconds.
    pub fn timestamp_field(&self, field: &str) -> Option<f64> {
        let pointer = format!("/{}", field.replace('.', "/"));
        self.value.pointer(&pointer).and_then(Value::as_f64)
    }

    /// Event timestamp for day routing, in epoch seconds: the first of
    /// `fields` present on the document.
    ///
    /// # Errors
    /// `Routing` when no field is present and numeric.
    pub fn event_timestamp(&self, fields: &[String]) -> Result<f64, ContractError> {
        fields
            .iter()
            .find_map(|f| self.timestamp_field(f))
            .ok_or_else(|| {
                ContractError::routing(
                    &self.id,
                    format!("none of [{}] present", fields.join(", ")),
                )
            })
    }
}
