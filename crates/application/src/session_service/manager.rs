use std::sync::Arc;

use chrono::{DateTime, Utc};
use clinicore_domain::{
    SessionEffect, SessionEvent, SessionPhase, SessionPolicy, SessionState, step,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ports::{HeartbeatTransport, SessionObserver, SharedActivityStore};

/// Drives the pure session state machine with real timers, the shared
/// activity slot, and the heartbeat transport.
///
/// One instance corresponds to one browsing context of one session. The
/// instance is terminal once expired or destroyed; starting a new session
/// requires a new instance.
pub struct SessionLifecycleManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    policy: SessionPolicy,
    store: Arc<dyn SharedActivityStore>,
    transport: Arc<dyn HeartbeatTransport>,
    observer: Arc<dyn SessionObserver>,
    runtime: Mutex<SessionRuntime>,
}

struct SessionRuntime {
    state: SessionState,
    /// Timer generation. Bumped on every reschedule so a superseded timer
    /// task can never fire into the current schedule.
    epoch: u64,
    visible: bool,
    destroyed: bool,
    timer: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl SessionLifecycleManager {
    /// Starts a session: records initial activity, schedules the warning and
    /// expiry timers, and begins the heartbeat loop.
    pub async fn start(
        policy: SessionPolicy,
        store: Arc<dyn SharedActivityStore>,
        transport: Arc<dyn HeartbeatTransport>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let now = Utc::now();
        let inner = Arc::new(SessionInner {
            policy,
            store,
            transport,
            observer,
            runtime: Mutex::new(SessionRuntime {
                state: SessionState::started_at(now),
                epoch: 0,
                visible: true,
                destroyed: false,
                timer: None,
                heartbeat: None,
            }),
        });

        let manager = Self {
            inner: Arc::clone(&inner),
        };
        apply_event(&inner, SessionEvent::Activity { at: now }, None).await;

        let heartbeat = spawn_heartbeat(Arc::clone(&inner));
        inner.runtime.lock().await.heartbeat = Some(heartbeat);

        manager
    }

    /// Records user activity, resetting the inactivity clock in this context
    /// and in the shared slot. No-op once expired or destroyed.
    pub async fn record_activity(&self) {
        apply_event(&self.inner, SessionEvent::Activity { at: Utc::now() }, None).await;
    }

    /// Equivalent to an activity event; used when a caller confirms the
    /// warning dialog.
    pub async fn extend(&self) {
        self.record_activity().await;
    }

    /// Suspends the heartbeat while the context is hidden. Timers keep
    /// running.
    pub async fn set_hidden(&self) {
        self.inner.runtime.lock().await.visible = false;
    }

    /// Resumes from hidden: reconciles against the shared slot, expiring
    /// immediately when the shared inactivity window has elapsed, otherwise
    /// rescheduling from the shared value and resuming the heartbeat.
    pub async fn set_visible(&self) {
        let shared = match self.inner.store.get().await {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, "shared activity read failed");
                None
            }
        };

        self.inner.runtime.lock().await.visible = true;
        apply_event(
            &self.inner,
            SessionEvent::Resumed {
                at: Utc::now(),
                shared_last_activity: shared,
            },
            None,
        )
        .await;
    }

    /// Idempotent teardown without the timeout callback; used on explicit
    /// logout so a stale timer cannot fire after credentials are already
    /// cleared.
    pub async fn destroy(&self) {
        {
            let mut runtime = self.inner.runtime.lock().await;
            if runtime.destroyed {
                return;
            }
            runtime.destroyed = true;
            runtime.epoch += 1;
            if let Some(task) = runtime.timer.take() {
                task.abort();
            }
            if let Some(task) = runtime.heartbeat.take() {
                task.abort();
            }
        }

        if let Err(error) = self.inner.store.clear().await {
            warn!(%error, "shared activity clear failed");
        }
        debug!("session destroyed");
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        self.inner.runtime.lock().await.state.phase
    }
}

/// Applies one event to the state machine and interprets its effects.
///
/// `timer_epoch` is set for events raised by a timer task; the event is
/// discarded when that generation has been superseded.
async fn apply_event(inner: &Arc<SessionInner>, event: SessionEvent, timer_epoch: Option<u64>) {
    let mut record_at = None;
    let mut notify_warning = false;
    let mut terminate = false;

    {
        let mut runtime = inner.runtime.lock().await;
        if runtime.destroyed || runtime.state.phase == SessionPhase::Expired {
            return;
        }
        if timer_epoch.is_some_and(|epoch| runtime.epoch != epoch) {
            return;
        }

        let (state, effects) = step(&runtime.state, &event, &inner.policy);
        runtime.state = state;

        for effect in effects {
            match effect {
                SessionEffect::RecordActivity { at } => record_at = Some(at),
                SessionEffect::ScheduleTimers {
                    warning_at,
                    expiry_at,
                } => {
                    runtime.epoch += 1;
                    if let Some(task) = runtime.timer.take() {
                        task.abort();
                    }
                    runtime.timer = Some(spawn_timer(
                        Arc::clone(inner),
                        runtime.epoch,
                        warning_at,
                        expiry_at,
                    ));
                }
                SessionEffect::NotifyWarning => notify_warning = true,
                SessionEffect::Terminate => terminate = true,
            }
        }

        if terminate {
            runtime.epoch += 1;
            if let Some(task) = runtime.timer.take() {
                // A timer task terminating the session is this very task;
                // aborting it here would cancel the teardown below.
                if timer_epoch.is_none() {
                    task.abort();
                }
            }
            if let Some(task) = runtime.heartbeat.take() {
                task.abort();
            }
        }
    }

    if let Some(at) = record_at
        && let Err(error) = inner.store.set(at).await
    {
        warn!(%error, "shared activity write failed");
    }

    if notify_warning {
        inner.observer.on_warning().await;
    }

    if terminate {
        // Teardown order: timers stopped above, then the shared slot is
        // cleared before the callback runs.
        if let Err(error) = inner.store.clear().await {
            warn!(%error, "shared activity clear failed");
        }
        inner.observer.on_timeout().await;
    }
}

fn spawn_timer(
    inner: Arc<SessionInner>,
    epoch: u64,
    warning_at: DateTime<Utc>,
    expiry_at: DateTime<Utc>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(until(warning_at)).await;
        apply_event(&inner, SessionEvent::WarningElapsed, Some(epoch)).await;

        tokio::time::sleep(until(expiry_at)).await;
        apply_event(&inner, SessionEvent::TimeoutElapsed, Some(epoch)).await;
    })
}

fn spawn_heartbeat(inner: Arc<SessionInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.policy.heartbeat_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let visible = {
                let runtime = inner.runtime.lock().await;
                if runtime.destroyed || runtime.state.phase == SessionPhase::Expired {
                    break;
                }
                runtime.visible
            };
            if !visible {
                continue;
            }

            if let Err(error) = inner.transport.ping().await {
                warn!(%error, "heartbeat ping failed");
            }
        }
    })
}

fn until(deadline: DateTime<Utc>) -> std::time::Duration {
    (deadline - Utc::now()).to_std().unwrap_or_default()
}
