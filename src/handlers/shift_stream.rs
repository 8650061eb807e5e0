//! Reacts to writes on the Shift table's stream.

use aws_lambda_events::dynamodb::{Event, EventRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_dynamo::from_item;
use tracing::{debug, error, warn};

use crate::alarm::AlarmScheduler;
use crate::error::{Error, Result};
use crate::model::Shift;
use crate::notify::Notifier;
use crate::store::DataStore;
use crate::timer::DelayedExecution;

#[derive(Debug, Deserialize)]
struct ShiftKey {
    id: String,
}

/// What a stream record asks of the alarm scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum ShiftChange {
    Upsert(Box<Shift>),
    Removed(String),
}

/// Decodes one stream record. Records that cannot affect alarms yield `None`.
pub fn change_of(record: EventRecord) -> Result<Option<ShiftChange>> {
    match record.event_name.as_str() {
        "INSERT" | "MODIFY" => {
            let shift: Shift = from_item(record.change.new_image)?;
            if record.event_name == "MODIFY" {
                let old: Option<Shift> = from_item(record.change.old_image).ok();
                // No-op writes leave the armed alarms as they are.
                if old.as_ref() == Some(&shift) {
                    return Ok(None);
                }
            }
            Ok(Some(ShiftChange::Upsert(Box::new(shift))))
        }
        "REMOVE" => {
            let key: ShiftKey = from_item(record.change.keys)?;
            Ok(Some(ShiftChange::Removed(key.id)))
        }
        other => {
            debug!(event_name = other, "ignoring stream record");
            Ok(None)
        }
    }
}

pub async fn apply<S, T, N>(
    scheduler: &AlarmScheduler<S, T, N>,
    change: ShiftChange,
    now: DateTime<Utc>,
) -> Result<()>
where
    S: DataStore,
    T: DelayedExecution,
    N: Notifier,
{
    match change {
        ShiftChange::Upsert(shift) => {
            if let Some(Err(err)) = shift.repeat.as_ref().map(|repeat| repeat.validate()) {
                warn!(shift_id = %shift.id, error = %err, "repeat rule expands to nothing");
            }
            scheduler.arm(&shift, now).await?;
        }
        ShiftChange::Removed(shift_id) => {
            let removed = scheduler.disarm(&shift_id).await?;
            debug!(shift_id = %shift_id, removed, "shift alarms disarmed");
        }
    }
    Ok(())
}

/// Applies every record, then fails the batch if any record hit a transient error.
///
/// Undecodable records are logged and dropped since redelivery cannot fix them.
pub async fn handle<S, T, N>(
    scheduler: &AlarmScheduler<S, T, N>,
    event: Event,
    now: DateTime<Utc>,
) -> Result<()>
where
    S: DataStore,
    T: DelayedExecution,
    N: Notifier,
{
    let total = event.records.len();
    let mut failed = 0;
    for record in event.records {
        let event_id = record.event_id.clone();
        let outcome = match change_of(record) {
            Ok(Some(change)) => apply(scheduler, change, now).await,
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                error!(event_id = %event_id, error = %err, "stream record failed");
                failed += 1;
            }
            Err(err) => {
                error!(event_id = %event_id, error = %err, "dropping stream record");
            }
        }
    }
    if failed > 0 {
        return Err(Error::BatchFailed { failed, total });
    }
    Ok(())
}
