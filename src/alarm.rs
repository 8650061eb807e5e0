//! Alarm cycles for shift alerts, starts and ends.
//!
//! Each (shift, alarm type, recipient) pair cycles independently:
//!
//! ```text
//! Unscheduled --arm--> Scheduled --timer fires--> Fired --+--> Rescheduled (new ShiftAlarm row)
//!                                                         +--> Terminal    (row acknowledged)
//! ```
//!
//! A `ShiftAlarm` row exists exactly while its cycle is `Scheduled`. The
//! fired-trigger consumer owns acknowledgement: whatever happens to the
//! shift, profile or subscription after scheduling, the row is deleted and
//! the cycle either continues with a fresh row or stops.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AlarmSettings;
use crate::error::Result;
use crate::model::{AlarmMessage, AlarmType, Interval, Shift, ShiftAlarm};
use crate::notify::{Notification, Notifier};
use crate::recurrence::Occurrences;
use crate::store::DataStore;
use crate::timer::DelayedExecution;

/// Why a fired alarm did not re-arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The row was already deleted; a duplicate delivery.
    AlreadyAcknowledged,
    ShiftMissing,
    /// The recipient profile or its user is missing or deleted.
    RecipientInactive,
    SubscriptionMissing,
    NotRepeating,
    RepeatEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    Rescheduled { next: ShiftAlarm },
    Terminal { reason: TerminalReason, notified: bool },
}

impl FireOutcome {
    fn terminal(reason: TerminalReason) -> Self {
        Self::Terminal {
            reason,
            notified: false,
        }
    }
}

/// Who an alarm goes to, and through which subscription for patron alarms.
#[derive(Debug, Clone)]
struct Recipient {
    profile_id: String,
    subscription_id: Option<String>,
}

/// Alarm ids derive from what they fire for and when, so re-arming the same
/// trigger converges on one row and one schedule, while a moved trigger
/// never shares a schedule name with the one it replaces.
fn alarm_id(
    shift: &Shift,
    alarm_type: AlarmType,
    recipient: &Recipient,
    occurrence: &Interval,
    at: DateTime<Utc>,
) -> String {
    let key = format!(
        "{}/{:?}/{}/{}/{}",
        shift.id,
        alarm_type,
        recipient.profile_id,
        occurrence.start.timestamp(),
        at.timestamp()
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

pub struct AlarmScheduler<S, T, N> {
    store: S,
    timer: T,
    notifier: N,
    settings: AlarmSettings,
}

impl<S, T, N> AlarmScheduler<S, T, N>
where
    S: DataStore,
    T: DelayedExecution,
    N: Notifier,
{
    pub fn new(store: S, timer: T, notifier: N, settings: AlarmSettings) -> Self {
        Self {
            store,
            timer,
            notifier,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces every alarm of `shift` with fresh cycles computed from `now`.
    ///
    /// Schedules the staff alert for the owner when the shift has an alert
    /// offset, and alert/start/end alarms for each patron subscribed to the
    /// owning profile.
    pub async fn arm(&self, shift: &Shift, now: DateTime<Utc>) -> Result<Vec<ShiftAlarm>> {
        self.disarm(&shift.id).await?;

        let owner = Recipient {
            profile_id: shift.profile_id.clone(),
            subscription_id: None,
        };
        let mut cycles = vec![(AlarmType::StaffAlert, owner)];
        for subscription in self.store.list_subscriptions_by_profile(&shift.profile_id).await? {
            for alarm_type in AlarmType::PATRON {
                cycles.push((
                    alarm_type,
                    Recipient {
                        profile_id: subscription.subscriber_profile_id.clone(),
                        subscription_id: Some(subscription.id.clone()),
                    },
                ));
            }
        }

        let scheduled = try_join_all(
            cycles
                .iter()
                .map(|(alarm_type, recipient)| self.arm_first(shift, *alarm_type, recipient, now)),
        )
        .await?;
        let scheduled: Vec<ShiftAlarm> = scheduled.into_iter().flatten().collect();

        info!(shift_id = %shift.id, alarms = scheduled.len(), "shift alarms armed");
        Ok(scheduled)
    }

    /// Cancels the pending triggers of a shift and acknowledges its alarms.
    ///
    /// A row is only deleted once its trigger is cancelled; a failed cancel
    /// leaves it in place for the retried event.
    pub async fn disarm(&self, shift_id: &str) -> Result<usize> {
        let alarms = self.store.list_alarms_by_shift(shift_id).await?;
        for alarm in &alarms {
            if let Err(err) = self.timer.cancel(&alarm.execution).await {
                warn!(alarm_id = %alarm.id, error = %err, "failed to cancel trigger");
                return Err(err);
            }
            self.store.delete_alarm(&alarm.id).await?;
        }
        Ok(alarms.len())
    }

    /// Handles one delivery of a fired trigger.
    ///
    /// Missing rows are expected outcomes and end the cycle without error;
    /// only infrastructure failures are returned so the delivery is retried.
    pub async fn handle_fired(&self, message: &AlarmMessage, now: DateTime<Utc>) -> Result<FireOutcome> {
        let Some(alarm) = self.store.get_alarm(&message.shift_alarm_id).await? else {
            info!(alarm_id = %message.shift_alarm_id, "alarm already acknowledged");
            return Ok(FireOutcome::terminal(TerminalReason::AlreadyAcknowledged));
        };

        let Some(shift) = self.store.get_shift(&alarm.shift_id).await? else {
            warn!(alarm_id = %alarm.id, shift_id = %alarm.shift_id, "shift gone, ending cycle");
            return self.acknowledge(&alarm, FireOutcome::terminal(TerminalReason::ShiftMissing)).await;
        };

        if !self.is_active_profile(&alarm.recipient_profile_id).await? {
            warn!(
                alarm_id = %alarm.id,
                recipient = %alarm.recipient_profile_id,
                "recipient inactive, ending cycle"
            );
            return self
                .acknowledge(&alarm, FireOutcome::terminal(TerminalReason::RecipientInactive))
                .await;
        }

        if let Some(subscription_id) = &alarm.subscription_id {
            if self.store.get_subscription(subscription_id).await?.is_none() {
                info!(alarm_id = %alarm.id, subscription_id = %subscription_id, "subscription removed");
                return self
                    .acknowledge(&alarm, FireOutcome::terminal(TerminalReason::SubscriptionMissing))
                    .await;
            }
        }

        let staff_name = if alarm.alarm_type.is_patron() {
            self.store
                .get_profile(&shift.profile_id)
                .await?
                .and_then(|profile| profile.name)
        } else {
            None
        };
        let notification = Notification::for_alarm(
            alarm.alarm_type,
            &alarm.recipient_profile_id,
            &shift,
            &alarm.occurrence(),
            staff_name.as_deref(),
        );
        self.notifier.send(&notification).await?;

        let recipient = Recipient {
            profile_id: alarm.recipient_profile_id.clone(),
            subscription_id: alarm.subscription_id.clone(),
        };
        let outcome = if !shift.has_active_repeat(now) {
            let reason = if shift.repeat.is_some() {
                TerminalReason::RepeatEnded
            } else {
                TerminalReason::NotRepeating
            };
            FireOutcome::Terminal {
                reason,
                notified: true,
            }
        } else {
            match self.next_after(&shift, &alarm, now) {
                Some((occurrence, at)) => {
                    let next = self
                        .register(&shift, alarm.alarm_type, &recipient, occurrence, at)
                        .await?;
                    FireOutcome::Rescheduled { next }
                }
                None => FireOutcome::Terminal {
                    reason: TerminalReason::RepeatEnded,
                    notified: true,
                },
            }
        };

        self.acknowledge(&alarm, outcome).await
    }

    async fn acknowledge(&self, alarm: &ShiftAlarm, outcome: FireOutcome) -> Result<FireOutcome> {
        self.store.delete_alarm(&alarm.id).await?;
        info!(
            alarm_id = %alarm.id,
            shift_id = %alarm.shift_id,
            alarm_type = ?alarm.alarm_type,
            outcome = ?outcome,
            "alarm acknowledged"
        );
        Ok(outcome)
    }

    async fn is_active_profile(&self, profile_id: &str) -> Result<bool> {
        let Some(profile) = self.store.get_profile(profile_id).await? else {
            return Ok(false);
        };
        if profile.deleted {
            return Ok(false);
        }
        Ok(self
            .store
            .get_user(&profile.user_id)
            .await?
            .is_some_and(|user| !user.deleted))
    }

    /// First occurrence whose trigger is still ahead of `now`.
    async fn arm_first(
        &self,
        shift: &Shift,
        alarm_type: AlarmType,
        recipient: &Recipient,
        now: DateTime<Utc>,
    ) -> Result<Option<ShiftAlarm>> {
        if alarm_type.trigger_at(&shift.interval(), shift.alert).is_none() {
            return Ok(None);
        }
        let next = Occurrences::starting_at(shift, now).find_map(|occurrence| {
            alarm_type
                .trigger_at(&occurrence, shift.alert)
                .filter(|at| *at > now)
                .map(|at| (occurrence, at))
        });
        match next {
            Some((occurrence, at)) => self
                .register(shift, alarm_type, recipient, occurrence, at)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// The occurrence `step` cycles past the fired alarm's date.
    ///
    /// Candidates never repeat the fired occurrence and never trigger in the past.
    fn next_after(&self, shift: &Shift, fired: &ShiftAlarm, now: DateTime<Utc>) -> Option<(Interval, DateTime<Utc>)> {
        // The alert offset may have been cleared since this alarm was armed.
        fired.alarm_type.trigger_at(&shift.interval(), shift.alert)?;
        let anchor = fired.alarm_date;
        let step = self.settings.step(fired.alarm_type);
        Occurrences::starting_at(shift, anchor)
            .filter(|occurrence| occurrence.start > anchor)
            .skip(step - 1)
            .filter(|occurrence| occurrence.start > fired.occurrence_start)
            .find_map(|occurrence| {
                fired
                    .alarm_type
                    .trigger_at(&occurrence, shift.alert)
                    .filter(|at| *at > anchor && *at > now)
                    .map(|at| (occurrence, at))
            })
    }

    async fn register(
        &self,
        shift: &Shift,
        alarm_type: AlarmType,
        recipient: &Recipient,
        occurrence: Interval,
        at: DateTime<Utc>,
    ) -> Result<ShiftAlarm> {
        let id = alarm_id(shift, alarm_type, recipient, &occurrence, at);
        let message = AlarmMessage {
            alarm_date: at,
            shift_alarm_id: id.clone(),
            subscription_id: recipient.subscription_id.clone(),
            alarm_type,
            recipient_profile_id: recipient.profile_id.clone(),
        };
        let execution = self.timer.schedule(at, &message).await?;

        let alarm = ShiftAlarm {
            id,
            shift_id: shift.id.clone(),
            alarm_type,
            recipient_profile_id: recipient.profile_id.clone(),
            subscription_id: recipient.subscription_id.clone(),
            execution,
            occurrence_start: occurrence.start,
            occurrence_end: occurrence.end,
            alarm_date: at,
        };
        self.store.put_alarm(&alarm).await?;
        info!(
            alarm_id = %alarm.id,
            shift_id = %shift.id,
            alarm_type = ?alarm_type,
            at = %at,
            "alarm scheduled"
        );
        Ok(alarm)
    }
}
