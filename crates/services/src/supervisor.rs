use chrono::{DateTime, Duration, Utc};

use assess_core::model::QuestionId;

/// Fixed per-question answer window, in seconds. Not configurable.
pub const QUESTION_TIME_LIMIT_SECS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed {
        question_id: QuestionId,
        armed_at: DateTime<Utc>,
    },
    Expired {
        question_id: QuestionId,
    },
}

/// A fired countdown: the question whose answer window closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expiry {
    pub question_id: QuestionId,
    pub elapsed_secs: f64,
}

/// Per-question countdown behind timeout auto-submission.
///
/// Armed when a question is presented and ticked cooperatively by the
/// controller. Elapsed time is recomputed from the arm timestamp on every
/// tick, so delayed or coalesced ticks cannot drift the deadline. The
/// supervisor fires at most once per armed question: firing moves it to
/// `Expired`, and disarming moves it to `Idle`, after which a tick can never
/// fire again until the next `arm`.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    state: TimerState,
}

impl TimeoutSupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
        }
    }

    /// Start the countdown for a freshly presented question.
    pub fn arm(&mut self, question_id: QuestionId, now: DateTime<Utc>) {
        self.state = TimerState::Armed {
            question_id,
            armed_at: now,
        };
    }

    /// Stop the countdown. Returns whether it was armed.
    pub fn disarm(&mut self) -> bool {
        let was_armed = matches!(self.state, TimerState::Armed { .. });
        self.state = TimerState::Idle;
        was_armed
    }

    /// Advance the countdown; fires once when the window has closed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Expiry> {
        let TimerState::Armed {
            question_id,
            armed_at,
        } = self.state
        else {
            return None;
        };

        let elapsed = now - armed_at;
        if elapsed < Duration::seconds(QUESTION_TIME_LIMIT_SECS) {
            return None;
        }

        self.state = TimerState::Expired { question_id };
        Some(Expiry {
            question_id,
            elapsed_secs: elapsed.num_milliseconds() as f64 / 1000.0,
        })
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    /// The question currently under countdown, if any.
    #[must_use]
    pub fn armed_question(&self) -> Option<QuestionId> {
        match self.state {
            TimerState::Armed { question_id, .. } => Some(question_id),
            _ => None,
        }
    }

    /// Seconds spent on the armed question so far.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<f64> {
        match self.state {
            TimerState::Armed { armed_at, .. } => {
                Some((now - armed_at).num_milliseconds().max(0) as f64 / 1000.0)
            }
            _ => None,
        }
    }

    /// Whole seconds left on the armed question, clamped to zero.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        match self.state {
            TimerState::Armed { armed_at, .. } => {
                let elapsed = (now - armed_at).num_seconds();
                Some((QUESTION_TIME_LIMIT_SECS - elapsed).max(0))
            }
            _ => None,
        }
    }
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::time::fixed_now;

    fn question() -> QuestionId {
        QuestionId::new(11)
    }

    #[test]
    fn does_not_fire_before_the_limit() {
        let mut supervisor = TimeoutSupervisor::new();
        let start = fixed_now();
        supervisor.arm(question(), start);

        assert_eq!(supervisor.tick(start + Duration::seconds(119)), None);
        assert!(supervisor.is_armed());
        assert_eq!(
            supervisor.remaining_secs(start + Duration::seconds(119)),
            Some(1)
        );
    }

    #[test]
    fn fires_exactly_once_at_the_limit() {
        let mut supervisor = TimeoutSupervisor::new();
        let start = fixed_now();
        supervisor.arm(question(), start);

        let expiry = supervisor
            .tick(start + Duration::seconds(QUESTION_TIME_LIMIT_SECS))
            .expect("should fire at the limit");
        assert_eq!(expiry.question_id, question());
        assert_eq!(expiry.elapsed_secs, 120.0);

        // second tick after firing is silent
        assert_eq!(
            supervisor.tick(start + Duration::seconds(QUESTION_TIME_LIMIT_SECS + 60)),
            None
        );
    }

    #[test]
    fn late_tick_fires_with_true_elapsed_time() {
        let mut supervisor = TimeoutSupervisor::new();
        let start = fixed_now();
        supervisor.arm(question(), start);

        // a single delayed tick, as if the tick loop was suspended
        let expiry = supervisor
            .tick(start + Duration::seconds(500))
            .expect("late tick still fires");
        assert_eq!(expiry.elapsed_secs, 500.0);
    }

    #[test]
    fn disarm_prevents_firing() {
        let mut supervisor = TimeoutSupervisor::new();
        let start = fixed_now();
        supervisor.arm(question(), start);

        assert!(supervisor.disarm());
        assert_eq!(supervisor.tick(start + Duration::seconds(1_000)), None);
        assert!(!supervisor.is_armed());
        assert_eq!(supervisor.remaining_secs(start), None);
    }

    #[test]
    fn rearming_restarts_the_window() {
        let mut supervisor = TimeoutSupervisor::new();
        let start = fixed_now();
        supervisor.arm(question(), start);
        supervisor.tick(start + Duration::seconds(QUESTION_TIME_LIMIT_SECS));

        let second = QuestionId::new(12);
        let rearmed_at = start + Duration::seconds(130);
        supervisor.arm(second, rearmed_at);
        assert_eq!(supervisor.armed_question(), Some(second));
        assert_eq!(supervisor.tick(rearmed_at + Duration::seconds(119)), None);
        let expiry = supervisor
            .tick(rearmed_at + Duration::seconds(120))
            .unwrap();
        assert_eq!(expiry.question_id, second);
    }
}
