//! Session inactivity state machine, expressed as a pure reducer.
//!
//! The machine is `Active → Warned → Expired`, with `Active` re-entered from
//! `Warned` on any activity. Timer scheduling, storage writes, and callbacks
//! are returned as effects for a shell to interpret, which keeps every
//! transition unit-testable without timers.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use clinicore_core::{AppError, AppResult};

/// Tunable inactivity policy. Configuration, not protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    timeout: Duration,
    warning_window: Duration,
    heartbeat_interval: Duration,
}

impl SessionPolicy {
    /// Creates a validated policy. The warning window must leave room before
    /// the timeout, and neither may be zero.
    pub fn new(
        timeout: Duration,
        warning_window: Duration,
        heartbeat_interval: Duration,
    ) -> AppResult<Self> {
        if timeout.is_zero() {
            return Err(AppError::Validation(
                "session timeout must be greater than zero".to_owned(),
            ));
        }

        if warning_window.is_zero() || warning_window >= timeout {
            return Err(AppError::Validation(
                "warning window must be non-zero and shorter than the timeout".to_owned(),
            ));
        }

        if heartbeat_interval.is_zero() {
            return Err(AppError::Validation(
                "heartbeat interval must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            timeout,
            warning_window,
            heartbeat_interval,
        })
    }

    /// Returns the inactivity timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the warning window preceding expiry.
    #[must_use]
    pub fn warning_window(&self) -> Duration {
        self.warning_window
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    fn timeout_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.timeout).unwrap_or(TimeDelta::MAX)
    }

    fn warning_window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.warning_window).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for SessionPolicy {
    /// Ten-minute timeout, two-minute warning window, thirty-second
    /// heartbeat.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            warning_window: Duration::from_secs(120),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// Lifecycle phase of one session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Activity observed within the timeout.
    Active,
    /// Warning window open; any activity returns to `Active`.
    Warned,
    /// Terminal. A new session requires a new instance.
    Expired,
}

/// Reducer state: the phase plus the inactivity clock's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Current phase.
    pub phase: SessionPhase,
    /// Most recent activity this context knows about.
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    /// Initial state for a session started at `at`.
    #[must_use]
    pub fn started_at(at: DateTime<Utc>) -> Self {
        Self {
            phase: SessionPhase::Active,
            last_activity: at,
        }
    }
}

/// Inputs consumed by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// User input observed, or an explicit extension.
    Activity {
        /// When the activity happened.
        at: DateTime<Utc>,
    },
    /// The warning timer fired for the current schedule.
    WarningElapsed,
    /// The expiry timer fired for the current schedule.
    TimeoutElapsed,
    /// The context became visible again and must reconcile against the
    /// shared activity slot.
    Resumed {
        /// When the context resumed.
        at: DateTime<Utc>,
        /// Most recent activity recorded by any context of this session.
        shared_last_activity: Option<DateTime<Utc>>,
    },
}

/// Effects the shell must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Write the activity timestamp to the shared slot.
    RecordActivity {
        /// Timestamp to record.
        at: DateTime<Utc>,
    },
    /// Replace both timers with this schedule.
    ScheduleTimers {
        /// When the warning callback is due.
        warning_at: DateTime<Utc>,
        /// When the expiry callback is due.
        expiry_at: DateTime<Utc>,
    },
    /// Invoke the warning callback.
    NotifyWarning,
    /// Tear down: stop timers and heartbeat, clear the shared slot, then
    /// invoke the timeout callback.
    Terminate,
}

fn schedule_from(at: DateTime<Utc>, policy: &SessionPolicy) -> SessionEffect {
    SessionEffect::ScheduleTimers {
        warning_at: at + policy.timeout_delta() - policy.warning_window_delta(),
        expiry_at: at + policy.timeout_delta(),
    }
}

/// Applies one event to the session state.
///
/// `Expired` absorbs every event. Timer events are assumed current; the
/// shell discards firings from superseded schedules before they reach the
/// reducer. Resume comparisons are inclusive: an inactivity gap equal to the
/// timeout expires the session.
#[must_use]
pub fn step(
    state: &SessionState,
    event: &SessionEvent,
    policy: &SessionPolicy,
) -> (SessionState, Vec<SessionEffect>) {
    if state.phase == SessionPhase::Expired {
        return (*state, Vec::new());
    }

    match event {
        SessionEvent::Activity { at } => (
            SessionState {
                phase: SessionPhase::Active,
                last_activity: *at,
            },
            vec![
                SessionEffect::RecordActivity { at: *at },
                schedule_from(*at, policy),
            ],
        ),
        SessionEvent::WarningElapsed => match state.phase {
            SessionPhase::Active => (
                SessionState {
                    phase: SessionPhase::Warned,
                    last_activity: state.last_activity,
                },
                vec![SessionEffect::NotifyWarning],
            ),
            _ => (*state, Vec::new()),
        },
        SessionEvent::TimeoutElapsed => (
            SessionState {
                phase: SessionPhase::Expired,
                last_activity: state.last_activity,
            },
            vec![SessionEffect::Terminate],
        ),
        SessionEvent::Resumed {
            at,
            shared_last_activity,
        } => {
            let effective = shared_last_activity.unwrap_or(state.last_activity);
            if *at - effective >= policy.timeout_delta() {
                (
                    SessionState {
                        phase: SessionPhase::Expired,
                        last_activity: effective,
                    },
                    vec![SessionEffect::Terminate],
                )
            } else {
                (
                    SessionState {
                        phase: SessionPhase::Active,
                        last_activity: effective,
                    },
                    vec![schedule_from(effective, policy)],
                )
            }
        }
    }
}
