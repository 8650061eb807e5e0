//! Consumes fired alarm triggers from the alarm queue.

use aws_lambda_events::sqs::{SqsEvent, SqsMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::alarm::{AlarmScheduler, FireOutcome};
use crate::error::{Error, Result};
use crate::model::AlarmMessage;
use crate::notify::Notifier;
use crate::store::DataStore;
use crate::timer::DelayedExecution;

/// Partial batch response: only the listed messages return to the queue.
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<ItemFailure>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_identifier: String,
}

fn parse(message: &SqsMessage) -> Result<AlarmMessage> {
    let body = message
        .body
        .as_deref()
        .ok_or_else(|| Error::Payload("message without body".into()))?;
    Ok(serde_json::from_str(body)?)
}

pub async fn handle_message<S, T, N>(
    scheduler: &AlarmScheduler<S, T, N>,
    message: &SqsMessage,
    now: DateTime<Utc>,
) -> Result<FireOutcome>
where
    S: DataStore,
    T: DelayedExecution,
    N: Notifier,
{
    let alarm = parse(message)?;
    scheduler.handle_fired(&alarm, now).await
}

/// Handles every message. Messages that failed transiently are reported
/// back for redelivery; everything else is acknowledged.
pub async fn handle<S, T, N>(
    scheduler: &AlarmScheduler<S, T, N>,
    event: SqsEvent,
    now: DateTime<Utc>,
) -> BatchResponse
where
    S: DataStore,
    T: DelayedExecution,
    N: Notifier,
{
    let mut response = BatchResponse::default();
    for message in &event.records {
        let message_id = message.message_id.clone().unwrap_or_default();
        match handle_message(scheduler, message, now).await {
            Ok(outcome) => {
                info!(message_id = %message_id, outcome = ?outcome, "alarm message handled");
            }
            Err(err) if err.is_transient() => {
                error!(message_id = %message_id, error = %err, "alarm message will be retried");
                response.batch_item_failures.push(ItemFailure {
                    item_identifier: message_id,
                });
            }
            Err(err) => {
                error!(message_id = %message_id, error = %err, "discarding alarm message");
            }
        }
    }
    response
}
