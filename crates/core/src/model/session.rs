use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::AssessmentId;
use crate::model::question::AssessmentKind;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl SessionStatus {
    /// Canonical wire name for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for parsing a status off the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown session status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress total must be at least 1")]
    ZeroTotal,

    #[error("progress current {current} exceeds total {total}")]
    CurrentPastTotal { current: u32, total: u32 },

    #[error("progress went backwards: {from} -> {to}")]
    Regressed { from: u32, to: u32 },

    #[error("progress total changed mid-session: {was} -> {now}")]
    TotalChanged { was: u32, now: u32 },
}

/// Position within a session: question `current` of `total`.
///
/// `total` is fixed when the session starts; `current` only moves forward and
/// never exceeds `total`. Both transitions are checked so a misbehaving server
/// cannot drive the local session backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    current: u32,
    total: u32,
}

impl Progress {
    /// Build a progress marker, validating `1 <= current <= total`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ZeroTotal` or `ProgressError::CurrentPastTotal`
    /// when the pair is inconsistent.
    pub fn new(current: u32, total: u32) -> Result<Self, ProgressError> {
        if total == 0 {
            return Err(ProgressError::ZeroTotal);
        }
        if current > total {
            return Err(ProgressError::CurrentPastTotal { current, total });
        }
        Ok(Self { current, total })
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// True when the last question of the session is the current one.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.current == self.total
    }

    /// Adopt the server-reported progress for the next question.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::TotalChanged` if the fixed total moved and
    /// `ProgressError::Regressed` if `current` went backwards.
    pub fn advance_to(&mut self, next: Progress) -> Result<(), ProgressError> {
        if next.total != self.total {
            return Err(ProgressError::TotalChanged {
                was: self.total,
                now: next.total,
            });
        }
        if next.current < self.current {
            return Err(ProgressError::Regressed {
                from: self.current,
                to: next.current,
            });
        }
        self.current = next.current;
        Ok(())
    }

    /// Force the marker to the end of the session, used on completion.
    pub fn complete(&mut self) {
        self.current = self.total;
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.total)
    }
}

//
// ─── SESSION SUMMARY ───────────────────────────────────────────────────────────
//

/// One row of the per-user session list.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: AssessmentId,
    pub kind: AssessmentKind,
    pub status: SessionStatus,
    pub cefr_level: Option<String>,
    pub lexile_estimate: Option<i32>,
    pub theta_score: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    #[must_use]
    pub fn new(
        id: AssessmentId,
        kind: AssessmentKind,
        status: SessionStatus,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            status,
            cefr_level: None,
            lexile_estimate: None,
            theta_score: None,
            started_at,
            completed_at: None,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
