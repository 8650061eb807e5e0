use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::DelayedExecution;
use crate::error::{Error, Result};
use crate::model::{AlarmMessage, ExecutionHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingExecution {
    pub handle: ExecutionHandle,
    pub at: DateTime<Utc>,
    pub message: AlarmMessage,
}

#[derive(Debug)]
struct Clock {
    now: DateTime<Utc>,
    pending: Vec<PendingExecution>,
    cancelled: Vec<String>,
    failing: bool,
    cancel_failing: bool,
}

/// [`DelayedExecution`] on a manually advanced clock.
///
/// Nothing fires on its own: [`VirtualTimer::advance_to`] hands back the
/// executions that came due so the caller can deliver them. Executions are
/// named after their alarm, and scheduling a name that is still pending
/// keeps the existing execution, as EventBridge Scheduler does.
#[derive(Debug, Clone)]
pub struct VirtualTimer {
    clock: Arc<Mutex<Clock>>,
}

impl VirtualTimer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Clock {
                now,
                pending: Vec::new(),
                cancelled: Vec::new(),
                failing: false,
                cancel_failing: false,
            })),
        }
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock().now
    }

    /// Pending executions ordered by due time.
    pub fn pending(&self) -> Vec<PendingExecution> {
        let mut pending = self.clock().pending.clone();
        pending.sort_by_key(|p| p.at);
        pending
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.clock().cancelled.clone()
    }

    /// Makes `schedule` fail with a transient timer error.
    pub fn set_failing(&self, failing: bool) {
        self.clock().failing = failing;
    }

    /// Makes `cancel` fail with a transient timer error.
    pub fn set_cancel_failing(&self, failing: bool) {
        self.clock().cancel_failing = failing;
    }

    /// Moves the clock forward and removes every execution due by `to`, earliest first.
    pub fn advance_to(&self, to: DateTime<Utc>) -> Vec<PendingExecution> {
        let mut clock = self.clock();
        if to > clock.now {
            clock.now = to;
        }
        let now = clock.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            clock.pending.drain(..).partition(|p| p.at <= now);
        clock.pending = rest;
        due.sort_by_key(|p| p.at);
        due
    }
}

#[async_trait]
impl DelayedExecution for VirtualTimer {
    async fn schedule(&self, at: DateTime<Utc>, message: &AlarmMessage) -> Result<ExecutionHandle> {
        let mut clock = self.clock();
        if clock.failing {
            return Err(Error::timer("virtual timer marked failing"));
        }
        let execution_ref = format!("virtual-{}", message.shift_alarm_id);
        if let Some(existing) = clock
            .pending
            .iter()
            .find(|p| p.handle.execution_ref == execution_ref)
        {
            return Ok(existing.handle.clone());
        }
        let handle = ExecutionHandle {
            execution_ref,
            started_at: clock.now,
        };
        clock.pending.push(PendingExecution {
            handle: handle.clone(),
            at,
            message: message.clone(),
        });
        Ok(handle)
    }

    async fn cancel(&self, handle: &ExecutionHandle) -> Result<()> {
        let mut clock = self.clock();
        if clock.cancel_failing {
            return Err(Error::timer("virtual timer cancel marked failing"));
        }
        clock
            .pending
            .retain(|p| p.handle.execution_ref != handle.execution_ref);
        clock.cancelled.push(handle.execution_ref.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlarmType;
    use chrono::{Duration, TimeZone};

    fn message(id: &str, at: DateTime<Utc>) -> AlarmMessage {
        AlarmMessage {
            alarm_date: at,
            shift_alarm_id: id.into(),
            subscription_id: None,
            alarm_type: AlarmType::PatronShiftStart,
            recipient_profile_id: "p".into(),
        }
    }

    #[tokio::test]
    async fn advance_releases_due_executions_in_order() {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let timer = VirtualTimer::new(t0);
        let late = t0 + Duration::hours(3);
        let early = t0 + Duration::hours(1);
        timer.schedule(late, &message("late", late)).await.unwrap();
        timer.schedule(early, &message("early", early)).await.unwrap();

        assert!(timer.advance_to(t0 + Duration::minutes(30)).is_empty());
        let due = timer.advance_to(t0 + Duration::hours(4));
        let ids: Vec<_> = due.iter().map(|p| p.message.shift_alarm_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(timer.pending().is_empty());
    }

    #[tokio::test]
    async fn cancel_drops_pending_execution() {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let timer = VirtualTimer::new(t0);
        let at = t0 + Duration::hours(1);
        let handle = timer.schedule(at, &message("a", at)).await.unwrap();
        timer.cancel(&handle).await.unwrap();
        timer.cancel(&handle).await.unwrap();
        assert!(timer.advance_to(at).is_empty());
        assert_eq!(timer.cancelled().len(), 2);
    }

    #[tokio::test]
    async fn scheduling_a_pending_name_keeps_the_first_execution() {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let timer = VirtualTimer::new(t0);
        let first = t0 + Duration::hours(1);
        let second = t0 + Duration::hours(2);
        let a = timer.schedule(first, &message("a", first)).await.unwrap();
        let b = timer.schedule(second, &message("a", second)).await.unwrap();

        assert_eq!(a, b);
        let pending = timer.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].at, first);
    }

    #[tokio::test]
    async fn failing_cancel_keeps_the_execution() {
        let t0 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let timer = VirtualTimer::new(t0);
        let at = t0 + Duration::hours(1);
        let handle = timer.schedule(at, &message("a", at)).await.unwrap();

        timer.set_cancel_failing(true);
        assert!(timer.cancel(&handle).await.unwrap_err().is_transient());
        assert_eq!(timer.pending().len(), 1);
    }
}
