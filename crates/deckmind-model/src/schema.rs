//! Per-slot payload schemas
//!
//! Each slot declares the fields its records may carry. Validation happens
//! at the edit-session boundary; the remote store is never trusted to have
//! enforced it.

use crate::payload::{FieldValue, Payload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared kind of a payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Flag,
    List,
}

impl FieldKind {
    /// Whether a concrete value matches this kind
    #[must_use]
    pub fn matches(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Text, FieldValue::Text(_))
                | (Self::Number, FieldValue::Number(_))
                | (Self::Flag, FieldValue::Flag(_))
                | (Self::List, FieldValue::List(_))
        )
    }
}

/// Declaration of one schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared kind
    pub kind: FieldKind,
    /// Whether submit requires a non-blank value
    pub required: bool,
}

impl FieldSpec {
    /// Required field of the given kind
    #[inline]
    #[must_use]
    pub const fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    /// Optional field of the given kind
    #[inline]
    #[must_use]
    pub const fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }
}

/// Schema for one slot's records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl SlotSchema {
    /// Create an empty schema (accepts nothing)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field declaration (builder style)
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Declared spec for one field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Field names in declaration (canonical) order
    ///
    /// The wizard presents fields in this order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of declared fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a single field assignment
    ///
    /// # Errors
    /// Returns [`SchemaViolation`] if the field is undeclared or the value
    /// kind does not match the declaration.
    pub fn validate_field(&self, name: &str, value: &FieldValue) -> Result<(), SchemaViolation> {
        let spec = self
            .fields
            .get(name)
            .ok_or_else(|| SchemaViolation::UnknownField {
                field: name.to_string(),
            })?;
        if !spec.kind.matches(value) {
            return Err(SchemaViolation::KindMismatch {
                field: name.to_string(),
                expected: spec.kind,
            });
        }
        Ok(())
    }

    /// Validate a full payload for submission
    ///
    /// # Errors
    /// Returns the first violation found: an undeclared field, a kind
    /// mismatch, or a required field that is absent or blank.
    pub fn validate_payload(&self, payload: &Payload) -> Result<(), SchemaViolation> {
        for (name, value) in payload.iter() {
            self.validate_field(name, value)?;
        }
        for (name, spec) in &self.fields {
            if spec.required && payload.get(name).map_or(true, FieldValue::is_blank) {
                return Err(SchemaViolation::MissingRequired {
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Slot-to-schema lookup for one container layout
///
/// An edit session resolves its schema here, including after a record
/// switch. Slots without a registered schema get the empty schema, which
/// rejects every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    slots: BTreeMap<crate::ids::SlotId, SlotSchema>,
}

impl SchemaCatalog {
    /// Create an empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot schema (builder style)
    #[must_use]
    pub fn with_slot(mut self, slot: crate::ids::SlotId, schema: SlotSchema) -> Self {
        self.slots.insert(slot, schema);
        self
    }

    /// Schema for one slot, empty if unregistered
    #[must_use]
    pub fn for_slot(&self, slot: crate::ids::SlotId) -> SlotSchema {
        self.slots.get(&slot).cloned().unwrap_or_default()
    }
}

/// Schema validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    /// Field is not declared by the slot schema
    #[error("unknown field: {field}")]
    UnknownField { field: String },

    /// Value kind does not match the declaration
    #[error("field {field} expects {expected:?}")]
    KindMismatch { field: String, expected: FieldKind },

    /// Required field absent or blank at submit time
    #[error("required field missing: {field}")]
    MissingRequired { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SlotSchema {
        SlotSchema::new()
            .with_field("title", FieldSpec::required(FieldKind::Text))
            .with_field("strength", FieldSpec::optional(FieldKind::Number))
            .with_field("insights", FieldSpec::optional(FieldKind::List))
    }

    #[test]
    fn accepts_declared_fields() {
        let s = schema();
        assert!(s.validate_field("title", &FieldValue::Text("x".into())).is_ok());
        assert!(s.validate_field("strength", &FieldValue::Number(0.5)).is_ok());
    }

    #[test]
    fn rejects_unknown_field() {
        let err = schema()
            .validate_field("colour", &FieldValue::Text("red".into()))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaViolation::UnknownField {
                field: "colour".into()
            }
        );
    }

    #[test]
    fn rejects_kind_mismatch() {
        let err = schema()
            .validate_field("title", &FieldValue::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, SchemaViolation::KindMismatch { .. }));
    }

    #[test]
    fn submit_requires_non_blank_required_fields() {
        let s = schema();
        let mut p = Payload::new();
        p.set("strength", FieldValue::Number(0.2));
        assert!(matches!(
            s.validate_payload(&p),
            Err(SchemaViolation::MissingRequired { .. })
        ));

        p.set("title", "   ");
        assert!(matches!(
            s.validate_payload(&p),
            Err(SchemaViolation::MissingRequired { .. })
        ));

        p.set("title", "filled");
        assert!(s.validate_payload(&p).is_ok());
    }
}
