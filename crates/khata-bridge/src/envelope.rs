//! # Result Envelope
//!
//! The uniform response shape for every boundary operation. A request always
//! resolves to one of these (success or failure) and never to a thrown
//! error.
//!
//! ## Canonical Shapes
//! ```text
//! collection:        { "success": true,  "data": [ ... ] }
//! single mutation:   { "success": true,  "data": { ... }, "changes": 1 }
//! invoice composite: { "success": true,  "createdInvoice": { ...,
//!                      "invoice_items": [ ... ] } }
//! removal:           { "success": true,  "changes": 1 }
//! failure:           { "success": false, "error": "message" }
//! ```
//!
//! The invoice operations key their payload by operation
//! (`createdInvoice` / `updatedInvoice` / `invoice`); a historical contract
//! the UI depends on, preserved as-is.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A boundary response. Construct through the associated functions; the
/// serialized form follows the canonical shapes above.
#[derive(Debug, Clone)]
pub struct Envelope {
    success: bool,
    payload_key: Option<&'static str>,
    payload: Option<Value>,
    changes: Option<u64>,
    error: Option<String>,
}

impl Envelope {
    fn ok() -> Self {
        Envelope {
            success: true,
            payload_key: None,
            payload: None,
            changes: None,
            error: None,
        }
    }

    /// Success with a `data` payload (entity or collection).
    ///
    /// A payload that fails to serialize degrades to a failure envelope
    /// rather than panicking across the boundary.
    pub fn data<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(payload) => {
                let mut env = Envelope::ok();
                env.payload_key = Some("data");
                env.payload = Some(payload);
                env
            }
            Err(e) => Envelope::fail(format!("failed to serialize response: {e}")),
        }
    }

    /// Success with a `data` payload plus a change count.
    pub fn data_with_changes<T: Serialize>(value: &T, changes: u64) -> Self {
        let mut env = Envelope::data(value);
        if env.success {
            env.changes = Some(changes);
        }
        env
    }

    /// Success with a payload under an operation-specific key
    /// (`createdInvoice`, `updatedInvoice`, `invoice`).
    pub fn keyed<T: Serialize>(key: &'static str, value: &T) -> Self {
        let mut env = Envelope::data(value);
        if env.success {
            env.payload_key = Some(key);
        }
        env
    }

    /// Removal outcome: `success` reports whether at least one row went away.
    pub fn removed(changes: u64) -> Self {
        let mut env = Envelope::ok();
        env.success = changes > 0;
        env.changes = Some(changes);
        env
    }

    /// Customer-delete outcome: a miss is `success: false` with empty data,
    /// NOT an error; the documented asymmetry against invoice lookups.
    pub fn deleted_rows<T: Serialize>(rows: &[T]) -> Self {
        let mut env = Envelope::data(&rows);
        if env.success {
            env.success = !rows.is_empty();
            env.changes = Some(rows.len() as u64);
        }
        env
    }

    /// Failure with a message. The only failure shape that crosses the
    /// boundary.
    pub fn fail(error: impl Into<String>) -> Self {
        Envelope {
            success: false,
            payload_key: None,
            payload: None,
            changes: None,
            error: Some(error.into()),
        }
    }

    /// Whether this envelope reports success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Serializes to a JSON value (infallible by construction).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "success": false, "error": "envelope serialization failed" })
        })
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut len = 1;
        if self.payload.is_some() {
            len += 1;
        }
        if self.changes.is_some() {
            len += 1;
        }
        if self.error.is_some() {
            len += 1;
        }

        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("success", &self.success)?;
        if let (Some(key), Some(payload)) = (self.payload_key, &self.payload) {
            map.serialize_entry(key, payload)?;
        }
        if let Some(changes) = self.changes {
            map.serialize_entry("changes", &changes)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_shape() {
        let env = Envelope::data(&vec![1, 2, 3]);
        assert_eq!(env.to_value(), json!({ "success": true, "data": [1, 2, 3] }));
    }

    #[test]
    fn test_mutation_shape_with_changes() {
        let env = Envelope::data_with_changes(&json!({ "id": 1 }), 1);
        assert_eq!(
            env.to_value(),
            json!({ "success": true, "data": { "id": 1 }, "changes": 1 })
        );
    }

    #[test]
    fn test_keyed_invoice_shape() {
        let env = Envelope::keyed("createdInvoice", &json!({ "id": 4 }));
        assert_eq!(
            env.to_value(),
            json!({ "success": true, "createdInvoice": { "id": 4 } })
        );
    }

    #[test]
    fn test_removed_success_tracks_count() {
        assert_eq!(
            Envelope::removed(1).to_value(),
            json!({ "success": true, "changes": 1 })
        );
        assert_eq!(
            Envelope::removed(0).to_value(),
            json!({ "success": false, "changes": 0 })
        );
    }

    #[test]
    fn test_deleted_rows_miss_is_not_an_error() {
        let env = Envelope::deleted_rows::<Value>(&[]);
        assert_eq!(
            env.to_value(),
            json!({ "success": false, "data": [], "changes": 0 })
        );
    }

    #[test]
    fn test_failure_shape() {
        let env = Envelope::fail("boom");
        assert!(!env.is_success());
        assert_eq!(env.to_value(), json!({ "success": false, "error": "boom" }));
    }
}
