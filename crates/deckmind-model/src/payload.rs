//! Record payloads and canonical fingerprints
//!
//! A [`Payload`] is the editable field map of one record. Field order is
//! irrelevant; the map is BTreeMap-backed so the JSON serialization is
//! canonical, which makes [`PayloadFingerprint`] a stable content identity.
//! The echo-suppression protocol compares fingerprints, never raw strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// One field value in a record payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean flag
    Flag(bool),
    /// Ordered list of text items (e.g. accepted insights)
    List(Vec<String>),
}

impl FieldValue {
    /// Whether the value carries no user content
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Number(_) | Self::Flag(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// The editable field map of one record
///
/// Cheap to clone for snapshotting; compare via [`Payload::fingerprint`]
/// rather than field-by-field when identity is what matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    fields: BTreeMap<String, FieldValue>,
}

impl Payload {
    /// Create an empty payload
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field, replacing any previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get one field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Remove one field, returning its previous value
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Iterate fields in canonical (name) order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields present
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field carries user content
    ///
    /// Blank text and empty lists do not count as content; an all-blank
    /// payload drives the wizard (rather than quick-edit) entry mode.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(FieldValue::is_blank)
    }

    /// Canonical JSON serialization
    ///
    /// BTreeMap ordering makes this byte-stable for equal payloads.
    #[must_use]
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }

    /// Content fingerprint of the canonical serialization
    #[must_use]
    pub fn fingerprint(&self) -> PayloadFingerprint {
        PayloadFingerprint::compute(self.canonical_json().as_bytes())
    }
}

impl FromIterator<(String, FieldValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A 32-byte Blake3 fingerprint of a payload's canonical serialization
///
/// Immutable and cheap to clone (Copy). Used as the submit write marker in
/// the echo-suppression protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayloadFingerprint([u8; 32]);

impl PayloadFingerprint {
    /// Compute Blake3 fingerprint of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for PayloadFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Short prefix is enough for log correlation
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
