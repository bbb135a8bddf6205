//! Candidate validation state machine
//!
//! Consumes an open-ended, incrementally arriving candidate sequence and
//! runs the judgment flow: collecting until enough candidates exist,
//! judging index-by-index (resonate / reject / discuss), completing the
//! instant the expected total of judgments is reached.
//!
//! The machine is pure: candidate arrival and judgments mutate it through
//! `&mut self` methods, and [`ValidationSession::state`] is computed from
//! the data. Stream plumbing and persistence live in [`crate::flow`].

use deckmind_model::{Candidate, Judgment};
use serde::{Deserialize, Serialize};

/// Candidates that must be available before judging can start
///
/// Fixed; independent of mode, expected total, and stream completion.
pub const JUDGING_THRESHOLD: usize = 3;

/// What the session is validating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Whole-deck research run
    Full,
    /// Re-validation of one record
    SingleRecord,
}

impl ValidationMode {
    /// Judgments required to complete the session
    #[inline]
    #[must_use]
    pub const fn expected_total(self) -> usize {
        match self {
            Self::Full => 15,
            Self::SingleRecord => 3,
        }
    }

    /// Stable key fragment for persistence contexts
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::SingleRecord => "single",
        }
    }
}

/// Computed lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    /// Fewer than [`JUDGING_THRESHOLD`] candidates have arrived
    Collecting,
    /// Judging index-by-index; `waiting` when the next candidate has not
    /// arrived yet and the stream is still open
    Judging { waiting: bool },
    /// Expected total reached; terminal
    Completed,
}

/// Judgment action failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JudgmentError {
    /// No unjudged candidate is available right now
    #[error("no candidate available to judge")]
    NothingToJudge,

    /// A discussion dialog is open; close it or reject from inside it
    #[error("discussion dialog is open")]
    DialogOpen,

    /// No discussion dialog is open
    #[error("no discussion dialog is open")]
    NoDialog,

    /// The session already completed
    #[error("session already completed")]
    AlreadyCompleted,
}

/// Serialized resume state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub mode: ValidationMode,
    pub seen: Vec<Candidate>,
    pub judged: Vec<Judgment>,
}

/// The judgment state machine over one candidate stream
#[derive(Debug, Clone)]
pub struct ValidationSession {
    mode: ValidationMode,
    seen: Vec<Candidate>,
    judged: Vec<Judgment>,
    streaming_complete: bool,
    discussing: bool,
}

impl ValidationSession {
    /// Fresh session for one mode
    #[must_use]
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            seen: Vec::new(),
            judged: Vec::new(),
            streaming_complete: false,
            discussing: false,
        }
    }

    /// Rehydrate from a persisted snapshot
    ///
    /// Open discussion dialogs are not persisted; a resumed session starts
    /// back at the judging prompt for the same index. Stream-end state is
    /// not persisted either: resuming always comes with a freshly opened
    /// candidate stream, so the session starts with the stream live.
    #[must_use]
    pub fn resume(snapshot: SessionSnapshot) -> Self {
        Self {
            mode: snapshot.mode,
            seen: snapshot.seen,
            judged: snapshot.judged,
            streaming_complete: false,
            discussing: false,
        }
    }

    /// Snapshot for persistence
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            seen: self.seen.clone(),
            judged: self.judged.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Judgments required to complete
    #[inline]
    #[must_use]
    pub fn expected_total(&self) -> usize {
        self.mode.expected_total()
    }

    /// Candidates seen so far, in arrival order
    #[must_use]
    pub fn seen(&self) -> &[Candidate] {
        &self.seen
    }

    /// Judgments so far, in judgment order
    #[must_use]
    pub fn judged(&self) -> &[Judgment] {
        &self.judged
    }

    /// Whether the candidate stream has ended
    #[inline]
    #[must_use]
    pub fn streaming_complete(&self) -> bool {
        self.streaming_complete
    }

    /// Whether a discussion dialog is open
    #[inline]
    #[must_use]
    pub fn discussing(&self) -> bool {
        self.discussing
    }

    /// Computed lifecycle state
    ///
    /// Completion is driven solely by reaching the expected total. A
    /// stream that ends short of it leaves the session in
    /// `Judging { waiting: false }` once everything seen is judged; see
    /// [`Self::stream_exhausted`].
    #[must_use]
    pub fn state(&self) -> ValidationState {
        if self.judged.len() >= self.expected_total() {
            return ValidationState::Completed;
        }
        if self.seen.len() < JUDGING_THRESHOLD {
            return ValidationState::Collecting;
        }
        ValidationState::Judging {
            waiting: self.judged.len() >= self.seen.len() && !self.streaming_complete,
        }
    }

    /// True when the stream ended, everything seen is judged, and the
    /// expected total was never reached
    ///
    /// The session does not auto-complete here; the surrounding flow must
    /// offer cancel/continue.
    #[must_use]
    pub fn stream_exhausted(&self) -> bool {
        self.streaming_complete
            && self.judged.len() >= self.seen.len()
            && self.judged.len() < self.expected_total()
    }

    /// The candidate awaiting judgment, if one has arrived
    #[must_use]
    pub fn current(&self) -> Option<&Candidate> {
        if self.state() == ValidationState::Completed {
            return None;
        }
        self.seen.get(self.judged.len())
    }

    /// Accepted candidates, in judgment order
    #[must_use]
    pub fn accepted(&self) -> Vec<&Candidate> {
        self.judged
            .iter()
            .filter(|j| j.resonated)
            .map(|j| &j.candidate)
            .collect()
    }

    /// Append one streamed candidate
    ///
    /// Arrivals after completion are accepted into `seen` but can never
    /// affect the terminal state; the flow layer discards them earlier.
    pub fn ingest(&mut self, candidate: Candidate) {
        tracing::debug!(id = %candidate.id, seen = self.seen.len() + 1, "candidate ingested");
        self.seen.push(candidate);
    }

    /// Mark the candidate stream ended
    pub fn finish_stream(&mut self) {
        self.streaming_complete = true;
    }

    /// Judge the current candidate as resonating
    ///
    /// # Errors
    /// [`JudgmentError`] when completed, mid-discussion, or no candidate
    /// is available.
    pub fn resonate(&mut self) -> Result<(), JudgmentError> {
        self.judge(true, false)
    }

    /// Judge the current candidate as not resonating
    ///
    /// # Errors
    /// Same conditions as [`Self::resonate`].
    pub fn reject(&mut self) -> Result<(), JudgmentError> {
        self.judge(false, false)
    }

    /// Open the discussion sub-dialog on the current candidate
    ///
    /// The dialog itself never judges; only
    /// [`Self::reject_from_discussion`] does.
    ///
    /// # Errors
    /// [`JudgmentError`] when completed, already discussing, or no
    /// candidate is available.
    pub fn open_discussion(&mut self) -> Result<(), JudgmentError> {
        if self.state() == ValidationState::Completed {
            return Err(JudgmentError::AlreadyCompleted);
        }
        if self.discussing {
            return Err(JudgmentError::DialogOpen);
        }
        if self.current().is_none() {
            return Err(JudgmentError::NothingToJudge);
        }
        self.discussing = true;
        Ok(())
    }

    /// Close the discussion dialog without judging
    ///
    /// Judging resumes at the same index.
    ///
    /// # Errors
    /// [`JudgmentError::NoDialog`] if none is open.
    pub fn close_discussion(&mut self) -> Result<(), JudgmentError> {
        if !self.discussing {
            return Err(JudgmentError::NoDialog);
        }
        self.discussing = false;
        Ok(())
    }

    /// The explicit "does not resonate" action inside the dialog
    ///
    /// Behaves exactly like [`Self::reject`] and closes the dialog.
    ///
    /// # Errors
    /// [`JudgmentError::NoDialog`] if none is open.
    pub fn reject_from_discussion(&mut self) -> Result<(), JudgmentError> {
        if !self.discussing {
            return Err(JudgmentError::NoDialog);
        }
        self.judge(false, true)?;
        self.discussing = false;
        Ok(())
    }

    fn judge(&mut self, resonated: bool, from_dialog: bool) -> Result<(), JudgmentError> {
        if self.state() == ValidationState::Completed {
            return Err(JudgmentError::AlreadyCompleted);
        }
        if self.discussing && !from_dialog {
            return Err(JudgmentError::DialogOpen);
        }
        let candidate = self
            .seen
            .get(self.judged.len())
            .cloned()
            .ok_or(JudgmentError::NothingToJudge)?;
        tracing::debug!(
            id = %candidate.id,
            resonated,
            judged = self.judged.len() + 1,
            expected = self.expected_total(),
            "candidate judged"
        );
        self.judged.push(Judgment {
            candidate,
            resonated,
        });
        Ok(())
    }
}
