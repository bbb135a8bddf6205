//! Candidates (insights) and judgments
//!
//! A candidate is one AI-generated item awaiting user judgment. It is
//! immutable once produced; the user's verdict is appended to the owning
//! validation session as a [`Judgment`], never written back into the
//! candidate itself.

use crate::ids::CandidateId;
use crate::record::RecordKey;
use serde::{Deserialize, Serialize};

/// Rarity tier derived from a candidate's score
///
/// Thresholds are fixed; the tier is presentation metadata, not an input
/// to any protocol decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl RarityTier {
    /// Derive tier from a score in [0, 1]
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 0.90 {
            Self::Legendary
        } else if score >= 0.75 {
            Self::Rare
        } else if score >= 0.50 {
            Self::Uncommon
        } else {
            Self::Common
        }
    }
}

/// One AI-generated insight awaiting judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    /// The insight text shown to the user
    pub content: String,
    /// Record this candidate relates to
    pub group_key: RecordKey,
    /// Backend confidence score in [0, 1]
    pub score: f32,
    /// Derived from `score` at creation time
    pub rarity: RarityTier,
    /// Persona the backend attributes the insight to
    pub presenter: String,
}

impl Candidate {
    /// Create a candidate, deriving its rarity tier from the score
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        group_key: RecordKey,
        score: f32,
        presenter: impl Into<String>,
    ) -> Self {
        Self {
            id: CandidateId::new(),
            content: content.into(),
            group_key,
            score,
            rarity: RarityTier::from_score(score),
            presenter: presenter.into(),
        }
    }
}

/// One user verdict over a candidate, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub candidate: Candidate,
    /// True for resonate, false for reject
    pub resonated: bool,
}
